mod project;
mod renderer;
mod scanner;

pub use project::{ProjectScanner, ScanError};
pub use renderer::{Preview, PreviewRenderer, RenderError};
pub use scanner::TemplateScanner;

mod template;

pub use template::{parse_parameter, parse_template_prefix, ParsedTemplate, TemplateParser};

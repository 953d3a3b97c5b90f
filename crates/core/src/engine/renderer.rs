use crate::models::TemplateParameter;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Why a parameter list was not summarized
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    #[error("empty template parameter list")]
    Empty,
    #[error("parameter list has no type or template parameters")]
    OnlyNonType,
}

/// A one-line summary of a parameter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// `template<...>` as drawn over the folded declaration
    pub text: String,
    /// The rendered parameters between `template<` and `>`
    pub params_text: String,
}

impl Preview {
    /// Width of the preview in chars
    pub fn width(&self) -> usize {
        self.text.chars().count()
    }
}

/// Renderer for condensing parsed parameters into preview text
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewRenderer;

impl PreviewRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a parameter list, refusing lists that carry no type information
    pub fn render(&self, params: &[TemplateParameter]) -> Result<Preview, RenderError> {
        if params.is_empty() {
            return Err(RenderError::Empty);
        }
        if params.iter().all(TemplateParameter::is_non_type) {
            return Err(RenderError::OnlyNonType);
        }
        let params_text = self.render_params(params);
        Ok(Preview {
            text: format!("template<{}>", params_text),
            params_text,
        })
    }

    fn render_params(&self, params: &[TemplateParameter]) -> String {
        params
            .iter()
            .map(|param| self.render_param(param))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_param(&self, param: &TemplateParameter) -> String {
        match param {
            TemplateParameter::Type {
                is_pack,
                name,
                default,
            } => self.render_type(*is_pack, name, default),
            TemplateParameter::NonType { value } => normalize(value),
            TemplateParameter::Template {
                params,
                is_pack,
                name,
                default,
            } => format!(
                "template<{}> {}",
                self.render_params(params),
                self.render_type(*is_pack, name, default)
            ),
        }
    }

    fn render_type(&self, is_pack: bool, name: &str, default: &str) -> String {
        let mut rendered = String::new();
        if is_pack {
            rendered.push_str("...");
        }
        let name = normalize(name);
        rendered.push_str(if name.is_empty() { "_" } else { &name });
        let default = normalize(default);
        if !default.is_empty() {
            rendered.push_str(" = ");
            rendered.push_str(&default);
        }
        rendered
    }
}

/// Collapse whitespace runs to one space and trim
fn normalize(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    whitespace.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_template_prefix;

    fn empty_type_param() -> TemplateParameter {
        TemplateParameter::type_param(false, "", "")
    }

    #[test]
    fn test_render_general_template() {
        let params = vec![
            TemplateParameter::type_param(false, "A", ""),
            TemplateParameter::type_param(false, "B", ""),
            TemplateParameter::non_type("int N"),
            TemplateParameter::template(vec![empty_type_param()], false, "TT", ""),
            TemplateParameter::type_param(false, "C", "One"),
            TemplateParameter::type_param(false, "", "double"),
        ];
        let preview = PreviewRenderer::new().render(&params).unwrap();
        assert_eq!(
            preview.text,
            "template<A, B, int N, template<_> TT, C = One, _ = double>"
        );
        assert_eq!(preview.params_text, "A, B, int N, template<_> TT, C = One, _ = double");
        assert_eq!(preview.width(), 58);
    }

    #[test]
    fn test_empty_list_is_not_rendered() {
        assert_eq!(PreviewRenderer::new().render(&[]), Err(RenderError::Empty));
    }

    #[test]
    fn test_all_non_type_is_not_rendered() {
        let params = vec![
            TemplateParameter::non_type("int A"),
            TemplateParameter::non_type("bool"),
            TemplateParameter::non_type("SomeClass ...C"),
        ];
        assert_eq!(
            PreviewRenderer::new().render(&params),
            Err(RenderError::OnlyNonType)
        );
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let params = vec![
            TemplateParameter::non_type("With\ttab"),
            TemplateParameter::non_type("With     spaces"),
            TemplateParameter::type_param(
                false,
                "With\n                                            newlines and spaces",
                "",
            ),
        ];
        assert_eq!(
            PreviewRenderer::new().render(&params).unwrap().text,
            "template<With tab, With spaces, With newlines and spaces>"
        );
    }

    #[test]
    fn test_preview_is_one_line() {
        let default = "typename std::enable_if<
                std::is_same<typename detail::decay<Other>::type, basic_tuple>::value
            >::type";
        let params = vec![
            TemplateParameter::type_param(false, "Other", ""),
            TemplateParameter::type_param(false, "", default),
        ];
        assert_eq!(
            PreviewRenderer::new().render(&params).unwrap().text,
            "template<Other, _ = typename std::enable_if< std::is_same<typename detail::decay<Other>::type, basic_tuple>::value >::type>"
        );
    }

    #[test]
    fn test_packs_and_nested_template_defaults() {
        let params = vec![
            TemplateParameter::type_param(true, "Ts", ""),
            TemplateParameter::template(
                vec![TemplateParameter::type_param(true, "", "")],
                true,
                "",
                "",
            ),
            TemplateParameter::template(
                vec![TemplateParameter::non_type("int")],
                false,
                "Arr",
                "std::array",
            ),
        ];
        assert_eq!(
            PreviewRenderer::new().render(&params).unwrap().text,
            "template<...Ts, template<..._> ..._, template<int> Arr = std::array>"
        );
    }

    #[test]
    fn test_render_parsed_declaration() {
        let parsed = parse_template_prefix(
            "template <typename Key,\n          typename Hash = std::hash<Key>,\n          std::size_t Capacity = 16>",
        )
        .unwrap();
        assert_eq!(
            PreviewRenderer::new().render(&parsed.params).unwrap().text,
            "template<Key, Hash = std::hash<Key>, std::size_t Capacity = 16>"
        );
    }
}

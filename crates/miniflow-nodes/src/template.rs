use miniflow_core::ExecutionContext;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TEMPLATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*(?:context\.)?([A-Za-z0-9_]+)\s*\}\}").expect("valid template regex")
});

/// Replace every `{{ name }}` / `{{ context.name }}` with the variable's string
/// form, or nothing when the variable is absent. Single pass; substituted text
/// is never expanded again.
pub fn render(input: &str, ctx: &ExecutionContext) -> String {
    TEMPLATE_PATTERN
        .replace_all(input, |caps: &Captures| {
            ctx.get(&caps[1]).map(|v| v.to_string()).unwrap_or_default()
        })
        .into_owned()
}

/// True while the text still carries `{{ ... }}` markers
pub fn has_markers(text: &str) -> bool {
    text.contains("{{") && text.contains("}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_variables() {
        let mut ctx = ExecutionContext::new();
        ctx.set("msg", "hi");
        ctx.set("n", 2i64);

        assert_eq!(render("echo {{msg}}", &ctx), "echo hi");
        assert_eq!(render("{{ context.msg }}-{{ n }}", &ctx), "hi-2");
        assert_eq!(render("[{{missing}}]", &ctx), "[]");
    }

    #[test]
    fn test_render_is_not_recursive() {
        let mut ctx = ExecutionContext::new();
        ctx.set("a", "{{b}}");
        ctx.set("b", "nope");

        assert_eq!(render("{{a}}", &ctx), "{{b}}");
    }

    #[test]
    fn test_unsupported_names_are_left_alone() {
        let ctx = ExecutionContext::new();
        let out = render("{{ not-a-name }}", &ctx);
        assert_eq!(out, "{{ not-a-name }}");
        assert!(has_markers(&out));
    }
}

use crate::{
    changelog::Section,
    error::{Error, Result},
    file::FileEntry,
};
use serde::Serialize;
use tera::{Context, Tera};

const PROMPT_TEMPLATE: &str = "sort_prompt";
const CHANGELOG_TEMPLATE: &str = "changelog";

#[derive(Serialize)]
struct PromptContext<'a> {
    depth: usize,
    files: &'a [FileEntry],
}

#[derive(Serialize)]
struct ChangelogContext<'a> {
    sections: &'a [Section<'a>],
}

/// Renders the model prompt and the changelog document.
pub(crate) struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Creates a template engine with the built-in templates registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in template fails to parse.
    pub(crate) fn new() -> Result<Self> {
        let mut tera = Tera::default();
        Self::register_builtin_templates(&mut tera)?;
        Ok(Self { tera })
    }

    fn register_builtin_templates(tera: &mut Tera) -> Result<()> {
        tera.add_raw_template(
            PROMPT_TEMPLATE,
            include_str!("../templates/sort_prompt.tera"),
        )
        .map_err(|e| Error::template(PROMPT_TEMPLATE, e))?;

        tera.add_raw_template(
            CHANGELOG_TEMPLATE,
            include_str!("../templates/changelog.tera"),
        )
        .map_err(|e| Error::template(CHANGELOG_TEMPLATE, e))?;

        Ok(())
    }

    /// Renders the folder-layout instruction for `files`.
    pub(crate) fn render_prompt(&self, files: &[FileEntry], depth: usize) -> Result<String> {
        let context = Context::from_serialize(PromptContext { depth, files })
            .map_err(|e| Error::template(PROMPT_TEMPLATE, e))?;
        let rendered = self
            .tera
            .render(PROMPT_TEMPLATE, &context)
            .map_err(|e| Error::template(PROMPT_TEMPLATE, e))?;
        Ok(rendered.trim_end().to_string())
    }

    /// Renders the changelog; the result always ends with exactly one newline.
    pub(crate) fn render_changelog(&self, sections: &[Section<'_>]) -> Result<String> {
        let context = Context::from_serialize(ChangelogContext { sections })
            .map_err(|e| Error::template(CHANGELOG_TEMPLATE, e))?;
        let rendered = self
            .tera
            .render(CHANGELOG_TEMPLATE, &context)
            .map_err(|e| Error::template(CHANGELOG_TEMPLATE, e))?;

        let mut out = rendered.trim_end().to_string();
        out.push('\n');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_parse() {
        assert!(TemplateEngine::new().is_ok());
    }

    #[test]
    fn test_prompt_lists_every_file() {
        let engine = TemplateEngine::new().unwrap();
        let files = vec![
            FileEntry::new("a.txt").with_preview(Some("hello \"world\"\nsecond".to_string())),
            FileEntry::new("img/b.png"),
        ];

        let prompt = engine.render_prompt(&files, 2).unwrap();

        assert!(prompt.contains("Maximum folder depth is 2."));
        assert!(prompt.contains("at most 2 path segments"));
        assert!(prompt.contains("- a.txt\n  content_preview: \"hello \\\"world\\\"\\nsecond\""));
        assert!(prompt.ends_with("- img/b.png (filename/extension only)"));
        assert!(prompt.contains(r#"{"moves": [{"path": "filename.txt", "target_folder": "documents"}, ...]}"#));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let engine = TemplateEngine::new().unwrap();
        let files = vec![FileEntry::new("x.md"), FileEntry::new("y.csv")];

        assert_eq!(
            engine.render_prompt(&files, 1).unwrap(),
            engine.render_prompt(&files, 1).unwrap()
        );
    }
}

//! Documentation generation and site-index assembly.

use std::path::Path;

use crate::execution::command::CommandExecutor;
use crate::registry::TaskContext;
use crate::results::StageReport;
use crate::types::PipelineResult;

/// Generate per-command help pages with the configured documentation
/// generator, then rebuild the site index so every generated page is
/// listed.
pub async fn build_documentation(ctx: TaskContext<'_>) -> PipelineResult<StageReport> {
    let module = ctx.settings.module_name()?.to_string();
    std::fs::create_dir_all(&ctx.settings.docs_dir)?;

    let executor = CommandExecutor::new(ctx.settings);
    executor.run_tool(
        &ctx.settings.tools.docs_generator,
        &[
            "generate".to_string(),
            "--module".to_string(),
            module.clone(),
            "--output".to_string(),
            ctx.settings.docs_dir.display().to_string(),
        ],
    )?;

    let pages = write_site_index(&module, &ctx.settings.docs_dir, &ctx.settings.site_index_path)?;
    println!("Documentation index lists {} page(s)", pages);
    Ok(StageReport::empty())
}

/// Write the site index: a static header followed by one nav entry per
/// generated page, in name order. Returns the number of pages listed.
pub fn write_site_index(
    module: &str,
    docs_dir: &Path,
    index_path: &Path,
) -> PipelineResult<usize> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(docs_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(name) = name.to_str() {
            if name.ends_with(".md") {
                pages.push(name.to_string());
            }
        }
    }
    pages.sort();

    let mut content = format!("site_name: {}\ntheme: readthedocs\nnav:\n", module);
    for page in &pages {
        let title = page.trim_end_matches(".md");
        content.push_str(&format!("  - {}: {}\n", title, page));
    }
    std::fs::write(index_path, content)?;

    Ok(pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_index_lists_pages_in_name_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let docs_dir = temp_dir.path().join("docs");
        std::fs::create_dir_all(&docs_dir).unwrap();
        std::fs::write(docs_dir.join("Get-Widget.md"), "# Get-Widget").unwrap();
        std::fs::write(docs_dir.join("Add-Widget.md"), "# Add-Widget").unwrap();
        std::fs::write(docs_dir.join("notes.txt"), "ignored").unwrap();

        let index_path = temp_dir.path().join("mkdocs.yml");
        let pages = write_site_index("Widget", &docs_dir, &index_path).unwrap();

        assert_eq!(pages, 2);
        let content = std::fs::read_to_string(&index_path).unwrap();
        assert!(content.starts_with("site_name: Widget\n"));
        let add = content.find("Add-Widget").unwrap();
        let get = content.find("Get-Widget").unwrap();
        assert!(add < get, "Pages should be listed in name order");
        assert!(!content.contains("notes.txt"));
    }

    #[test]
    fn test_site_index_with_no_pages_keeps_header() {
        let temp_dir = tempfile::tempdir().unwrap();
        let docs_dir = temp_dir.path().join("docs");
        std::fs::create_dir_all(&docs_dir).unwrap();

        let index_path = temp_dir.path().join("mkdocs.yml");
        let pages = write_site_index("Widget", &docs_dir, &index_path).unwrap();

        assert_eq!(pages, 0);
        let content = std::fs::read_to_string(&index_path).unwrap();
        assert!(content.contains("site_name: Widget"));
        assert!(content.trim_end().ends_with("nav:"));
    }
}

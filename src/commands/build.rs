use std::path::{Path, PathBuf};

use futures_util::future::try_join_all;
use markflow::site::LocalSite;

use crate::BuildArgs;

pub async fn run(args: &BuildArgs, config_file: Option<&Path>) -> Result<(), anyhow::Error> {
    let site = super::site(config_file, false)?;

    let layout = match &args.layout {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => None,
    };

    // Skip the output directory when it sits inside the input
    let output_dir = std::fs::canonicalize(&args.output).ok();
    let mut paths = Vec::new();
    collect_pages(&site, &args.input, output_dir.as_deref(), &mut paths)?;
    paths.sort();
    tracing::info!(pages = paths.len(), input = %args.input.display(), "rendering pages");

    // Pages share one immutable pipeline, so they render concurrently
    let pages = try_join_all(paths.iter().map(|path| site.render_page(path))).await?;

    for page in &pages {
        let relative = page.path.strip_prefix(&args.input)?;

        // Assets keep their name and skip the layout
        let (output_path, html) = if site.is_asset(&page.path) {
            (args.output.join(relative), page.content().to_string())
        } else {
            let html = match &layout {
                Some(layout) => site.render_layout(layout, page)?,
                None => page.content().to_string(),
            };
            (args.output.join(relative).with_extension("html"), html)
        };

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&output_path, html).await?;
    }

    println!(
        "Built {} pages to {}",
        pages.len(),
        args.output.display()
    );

    Ok(())
}

/// Recursively collect the files some loader claims.
fn collect_pages(
    site: &LocalSite,
    dir: &Path,
    skip: Option<&Path>,
    paths: &mut Vec<PathBuf>,
) -> Result<(), anyhow::Error> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        // Skip hidden files and directories
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if hidden {
            continue;
        }

        if path.is_dir() {
            if skip.is_some_and(|skip| path.canonicalize().is_ok_and(|p| p == skip)) {
                continue;
            }
            collect_pages(site, &path, skip, paths)?;
        } else if path.is_file() && site.handles(&path) {
            paths.push(path);
        }
    }

    Ok(())
}

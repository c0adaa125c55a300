use std::path::Path;

use futures_util::future::try_join_all;

use crate::RenderArgs;

pub async fn run(args: &RenderArgs, config_file: Option<&Path>) -> Result<(), anyhow::Error> {
    let site = super::site(config_file, args.sanitize)?;

    let pages = try_join_all(args.files.iter().map(|file| site.render_page(file))).await?;
    for page in &pages {
        println!("{}", page.content().trim());
    }

    Ok(())
}

//! `ragway init`: write a default config file.

use ragway_config::AppConfig;
use std::path::Path;

pub fn run(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !force {
        println!("  Config file already exists: {}", config_path.display());
        println!("  Use --force to overwrite it.");
        return Ok(());
    }

    write_default(config_path)?;

    println!("✅ Wrote {}", config_path.display());
    println!();
    println!("  Next steps:");
    println!("  1. Export GEMINI_KEY (or set api_key in the file)");
    println!("  2. Add a [[sources]] entry pointing at your documents");
    println!("  3. Run `ragway chat`");
    Ok(())
}

fn write_default(config_path: &Path) -> std::io::Result<()> {
    if let Some(dir) = config_path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(config_path, AppConfig::default_toml())
}

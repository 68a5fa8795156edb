use anyhow::{Context, Result};
use formdesk_infrastructure::ConfigService;

pub fn init(service: &ConfigService) -> Result<()> {
    let path = service.config_path()?;
    if path.exists() {
        println!("⚠️  Config already exists: {}", path.display());
        return Ok(());
    }
    // Loading writes the defaults when the file is missing.
    service.try_get_config()?;
    println!("✅ Wrote default config to {}", path.display());
    println!("\n💡 Next steps:");
    println!("  1. Add admin identities to [bot].admin_ids");
    println!("  2. Check the effective values: formdesk config show");
    Ok(())
}

pub fn show(service: &ConfigService) -> Result<()> {
    let config = service.try_get_config()?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render config as TOML")?;
    println!("# {}", service.config_path()?.display());
    println!("# database: {}", service.database_path(&config)?.display());
    println!("# logs: {}", service.log_dir(&config)?.display());
    println!();
    print!("{}", rendered);
    Ok(())
}

pub fn path(service: &ConfigService) -> Result<()> {
    println!("{}", service.config_path()?.display());
    Ok(())
}

//! List supported client versions.

use anyhow::Result;
use ncmrpc::{Config, LayoutCatalog};

pub fn run(config: &Config) -> Result<()> {
    let catalog = LayoutCatalog::with_signatures(config.signature_set()?);
    print!("{}", render(&catalog));
    Ok(())
}

fn render(catalog: &LayoutCatalog) -> String {
    let mut out = String::from("Fixed layouts:\n");
    for entry in catalog.fixed_entries() {
        out.push_str(&format!(
            "  {:<14} position +{:#x}, song array +{:#x}\n",
            entry.version, entry.position_offset, entry.song_array_offset
        ));
    }
    out.push_str("Scanned layouts:\n");
    for major in catalog.scanned_majors() {
        out.push_str(&format!("  {}.x\n", major));
    }
    out
}

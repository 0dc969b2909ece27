//! Signature file export and listing.

use std::path::Path;

use anyhow::{Context, Result};
use ncmrpc::signature::format_pattern;
use ncmrpc::{Config, SignatureSet, builtin_signatures, save_signatures};

/// Write the built-in signatures so they can be edited and loaded back
pub fn export(path: &Path) -> Result<()> {
    save_signatures(path, &builtin_signatures())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Signatures written to {}", path.display());
    Ok(())
}

pub fn show(config: &Config) -> Result<()> {
    let set = config.signature_set()?;
    print!("{}", render(&set)?);
    Ok(())
}

fn render(set: &SignatureSet) -> Result<String> {
    let mut out = String::new();
    for entry in &set.entries {
        out.push_str(&format!("{}:\n", entry.name));
        for signature in &entry.signatures {
            let pattern = format_pattern(&signature.pattern_bytes()?);
            out.push_str(&format!(
                "  {} (instr +{}, disp +{}, len {}{})\n",
                pattern,
                signature.instr_offset,
                signature.disp_offset,
                signature.instr_len,
                if signature.deref { ", deref" } else { "" }
            ));
        }
    }
    Ok(out)
}

//! One-shot diagnostics: locate, attach, resolve and sample once.

use anyhow::{Context, Result};
use ncmrpc::sync::{inspect, metadata_sources};
use ncmrpc::{
    Config, LayoutCatalog, MetadataCache, ProcessLocator, SampleOutcome, SongPointer,
    SystemProcessBackend, format_position,
};

pub fn run(config: &Config, with_metadata: bool) -> Result<()> {
    let catalog = LayoutCatalog::with_signatures(config.signature_set()?);
    let locator = ProcessLocator::new(config.target.executable.clone());
    let mut backend = SystemProcessBackend::new();

    let Some(inspection) = inspect(&mut backend, &locator, &catalog, &config.target.module)
        .context("Failed to inspect the client")?
    else {
        println!("{} is not running", locator.executable_name());
        return Ok(());
    };

    println!("Process:  pid {}", inspection.process.pid);
    println!("Path:     {}", inspection.process.executable.display());
    println!("Version:  {}", inspection.process.version);
    println!("Layout:   {}", inspection.layout);

    if let Some(pointers) = &inspection.pointers {
        println!("Position: {:#x}", pointers.position_address);
        match pointers.song {
            SongPointer::Indirect { slot_address } => println!("Song:     {:#x} (pointer)", slot_address),
            SongPointer::SsoString { string_address } => {
                println!("Song:     {:#x} (string)", string_address)
            }
        }
    }

    match &inspection.sample {
        Some(SampleOutcome::Ready(sample)) => {
            println!("Track:    {} (token {:?})", sample.song_id, sample.raw_token);
            println!("Time:     {}", format_position(sample.position_seconds));

            if with_metadata {
                let mut cache = MetadataCache::new(metadata_sources(&config.metadata));
                match cache.get(&sample.song_id) {
                    Some(metadata) => {
                        println!("Title:    {}", metadata.title);
                        println!("Artist:   {}", metadata.artist);
                        println!("Album:    {}", metadata.album);
                    }
                    None => println!(
                        "Metadata: not found (tried {})",
                        cache.source_names().join(", ")
                    ),
                }
            }
        }
        Some(SampleOutcome::NotReady { token }) => {
            println!("Track:    not loaded yet (token {:?})", token);
        }
        None => {}
    }

    if let Some(error) = &inspection.error {
        println!("Error:    {}", error);
    }
    Ok(())
}

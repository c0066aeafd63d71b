use std::path::Path;

use xp3_archive::Archive;

use crate::output::{OutputStyle, create_table, header_cell, numeric_cell, regular_cell};

/// Print an archive's entry list, one name per line, or as a table
/// with sizes and flags when `verbose` is set.
pub fn handle(archive: &Path, verbose: bool) -> anyhow::Result<()> {
    let archive = Archive::open(archive)?;

    if !verbose {
        for entry in archive.entries() {
            println!("{}", entry.name);
        }
        return Ok(());
    }

    let style = OutputStyle::new();
    let mut table = create_table(&style);
    table.set_header(vec![
        header_cell("Name", &style),
        header_cell("Size", &style),
        header_cell("Stored", &style),
        header_cell("Segments", &style),
        header_cell("Flags", &style),
    ]);

    for entry in archive.entries() {
        let mut flags = String::new();
        if entry.protected {
            flags.push('p');
        }
        if entry.segments.iter().any(|s| s.compressed) {
            flags.push('z');
        }

        table.add_row(vec![
            regular_cell(&entry.name),
            numeric_cell(&entry.original_size.to_string()),
            numeric_cell(&entry.archived_size.to_string()),
            numeric_cell(&entry.segments.len().to_string()),
            regular_cell(&flags),
        ]);
    }

    println!("{table}");
    println!(
        "{} entries, {} bytes unpacked",
        archive.entries().len(),
        archive
            .entries()
            .iter()
            .map(|e| e.original_size)
            .sum::<u64>()
    );
    Ok(())
}

use compstat_core::codec::{CodecKind, DEFAULT_EXTERNAL_TIMEOUT, SEVEN_ZIP_PROGRAMS};
use compstat_core::{Codec, Result, SevenZipPpmd};

pub fn run() -> Result<()> {
    println!("{:<10} {:<10} {}", "Codec", "Usable", "Adapter");
    println!("{}", "-".repeat(50));
    for kind in CodecKind::ALL {
        let adapter = kind.adapter(DEFAULT_EXTERNAL_TIMEOUT);
        let usable = if adapter.is_available() { "yes" } else { "no" };
        let detail = match kind {
            CodecKind::Ppmd => describe_seven_zip(),
            _ => "in-process".to_string(),
        };
        println!("{:<10} {:<10} {}", kind.name(), usable, detail);
    }
    println!("\nAliases: gz, bz2, br, zstandard, xz, 7z");
    Ok(())
}

/// Which 7-Zip executables are on PATH, in the order they are tried.
fn describe_seven_zip() -> String {
    let found: Vec<&str> = SEVEN_ZIP_PROGRAMS
        .iter()
        .copied()
        .filter(|p| SevenZipPpmd::new(p, DEFAULT_EXTERNAL_TIMEOUT).is_available())
        .collect();
    if found.is_empty() {
        format!("needs one of {} on PATH", SEVEN_ZIP_PROGRAMS.join(", "))
    } else {
        format!("7-Zip via {}", found.join(" > "))
    }
}

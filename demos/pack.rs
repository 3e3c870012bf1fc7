use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use nspkit::Result;
use nspkit::archive::{Archive, EntryInput, WriterOptions, build_archive, verify};
use nspkit::formats::CartridgeOptions;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some((out, inputs)) = args.split_first() else {
        eprintln!("usage: pack <out.nsp|out.xci> <file>...");
        return Ok(());
    };

    let options = if out.ends_with(".xci") {
        WriterOptions::xci(CartridgeOptions::default())
    } else {
        WriterOptions::nsp()
    };

    let mut entries = Vec::with_capacity(inputs.len());
    for path in inputs {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        entries.push(EntryInput::new(name, file, size));
    }

    let (_, report) = build_archive(BufWriter::new(File::create(out)?), options, entries)?;
    print!("{report}");

    let mut archive = Archive::open(File::open(out)?)?;
    for check in verify(&mut archive)?.checks {
        println!("{:<32} {:?}", check.region.to_string(), check.status);
    }

    Ok(())
}

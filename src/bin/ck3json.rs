use ck3bin::binary::{Ck3Tokens, FailedResolveStrategy, TokenDictionary};
use ck3bin::json::JsonWriter;
use ck3bin::Decoder;
use std::error;
use std::fs::File;
use std::io::{self, BufWriter, Write};

// Usage: ck3json [--pretty] [--stringify] <save> [tokens]
fn main() -> Result<(), Box<dyn error::Error>> {
    env_logger::init();

    let mut pretty = false;
    let mut strategy = FailedResolveStrategy::Error;
    let mut paths = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--pretty" => pretty = true,
            "--stringify" => strategy = FailedResolveStrategy::Stringify,
            _ => paths.push(arg),
        }
    }

    let save = paths
        .first()
        .ok_or("usage: ck3json [--pretty] [--stringify] <save> [tokens]")?;

    let owned;
    let tokens = match paths.get(1) {
        Some(path) => {
            owned = Ck3Tokens::new(TokenDictionary::from_file(path)?);
            &owned
        }
        None => Ck3Tokens::global()?,
    };

    let file = File::open(save)?;
    let decoder = Decoder::builder().on_failed_resolve(strategy).build(tokens);
    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());

    let mut out = if pretty {
        let mut writer = JsonWriter::pretty(out);
        decoder.decode(file, &mut writer)?;
        writer.into_inner()
    } else {
        let mut writer = JsonWriter::new(out);
        decoder.decode(file, &mut writer)?;
        writer.into_inner()
    };

    out.flush()?;
    Ok(())
}

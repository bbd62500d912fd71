/*!

A streaming decoder for [CK3](https://en.wikipedia.org/wiki/Crusader_Kings_III) binary save
files and other data encoded in the binary format of
[PDS](https://www.paradoxplaza.com/) developed titles.

## Features

- ✔ Streaming: Decode from any reader in fixed size chunks. The save is never held in memory.
- ✔ Complete: The compressed gamestate is decompressed and decoded in the same pass
- ✔ Pipelined: Decompression runs on its own thread behind a bounded channel
- ✔ Agnostic: Emit JSON text, a `serde_json::Value`, or drive any custom [`json::JsonSink`]

## Quick Start

A save is decoded with the token dictionary that names its 16 bit identifiers.

```rust
use ck3bin::{Decoder, binary::{Ck3Tokens, FragmentBuilder, TokenDictionary}};

# fn main() -> Result<(), ck3bin::Error> {
let dictionary = TokenDictionary::parse("0x3155 meta_data\n0x58f save_game_version\n")?;
let tokens = Ck3Tokens::new(dictionary);

let mut save = b"SAV0103b1a5c7230000a14e\n".to_vec();
let meta = FragmentBuilder::new()
    .id(0x3155).eq().open()
    .id(0x058f).eq().int(3)
    .close()
    .build();
save.extend_from_slice(&meta);

let json = Decoder::new(&tokens).to_json_vec(&save[..])?;
assert_eq!(
    json,
    br#"{"checksum":"SAV0103b1a5c7230000a14e","meta_data":{"save_game_version":3}}"#
);
# Ok(())
# }
```

Production code typically loads the dictionary once with [`binary::Ck3Tokens::global`],
which reads the file named by the `CK3_TOKENS` environment variable (or `assets/ck3.tok`).

## Overlays

The binary format encodes dates and high precision numbers as plain integers. Whether an
integer is a date is only known by the key it belongs to, so a curated table of
[overlays](binary::OVERLAYS) attaches decoding hints to identifiers:

- dates (`birth`, `date`, ...) are written as `"1436.1.1"` strings
- fixed point values (`gold`) are decoded as Q49.15
- arrays like `levels` may contain implicit `key = value` objects
- repeated keys like `triggered_event` are grouped under a single array

## One Level Lower

The [`binary::BinParser`] state machine can be driven directly with chunks of data. It reports
how many bytes it consumed so the caller can retry the remainder once more data arrives.

*/

pub mod binary;
mod buffer;
pub mod common;
mod decoder;
pub mod envelope;
mod errors;
pub mod json;
pub(crate) mod util;

pub use self::common::{Ck3Date, MAX_DATE_LEN};
pub use self::decoder::*;
pub use self::errors::*;

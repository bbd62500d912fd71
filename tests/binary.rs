use ck3bin::binary::{BinParser, Ck3Tokens, FragmentBuilder, ParseState};
use ck3bin::json::{JsonSink, JsonWriter};
use ck3bin::{decode_fragment, Decoder, ErrorKind};
use rstest::*;
use std::io::Read;

fn tokens() -> &'static Ck3Tokens {
    Ck3Tokens::global().unwrap()
}

fn id(name: &str) -> u16 {
    tokens().dictionary().id_of(name).unwrap()
}

fn frag() -> FragmentBuilder {
    FragmentBuilder::new()
}

fn meta_fragment() -> Vec<u8> {
    frag()
        .id(id("meta_data"))
        .eq()
        .open()
        .id(id("save_game_version"))
        .eq()
        .int(3)
        .id(id("version"))
        .eq()
        .quoted("1.12.5")
        .id(id("meta_date"))
        .eq()
        .int(56379360)
        .id(id("meta_player_name"))
        .eq()
        .unquoted("Petty King Ailill")
        .id(id("gold"))
        .eq()
        .long_float(4045371)
        .id(id("male"))
        .eq()
        .bool(true)
        .id(id("color"))
        .eq()
        .rgb(110, 27, 27)
        .id(id("levels"))
        .eq()
        .open()
        .int(1)
        .int(2)
        .int(3)
        .eq()
        .int(4)
        .int(5)
        .close()
        .id(id("triggered_event"))
        .eq()
        .open()
        .id(id("id"))
        .eq()
        .uint(10)
        .close()
        .id(id("triggered_event"))
        .eq()
        .open()
        .id(id("id"))
        .eq()
        .uint(11)
        .close()
        .id(id("history"))
        .eq()
        .open()
        .int(56379360)
        .eq()
        .open()
        .id(id("type"))
        .eq()
        .id(id("male"))
        .close()
        .close()
        .close()
        .build()
}

const META_JSON: &str = concat!(
    r#"{"meta_data":{"save_game_version":3,"version":"1.12.5","meta_date":"1436.1.1","#,
    r#""meta_player_name":"Petty King Ailill","gold":123.45493,"male":true,"#,
    r#""color":[110,27,27],"levels":[1,2,{"3":4},5],"#,
    r#""triggered_event":[{"id":10},{"id":11}],"#,
    r#""history":{"1436.1.1":{"type":"male"}}}}"#
);

#[test]
fn test_unnamed_empty_object_is_fatal() {
    let data = frag().open().close().build();
    let err = decode_fragment(&data, tokens()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnnamedContainer { .. }));
}

#[test]
fn test_empty_object() {
    let data = frag().id(id("meta_data")).eq().open().close().build();
    assert_eq!(
        decode_fragment(&data, tokens()).unwrap(),
        r#"{"meta_data":{}}"#
    );
}

#[test]
fn test_identifier_int_pair() {
    let data = frag().id(id("save_game_version")).eq().int(3).build();
    assert_eq!(
        decode_fragment(&data, tokens()).unwrap(),
        r#"{"save_game_version":3}"#
    );
}

#[test]
fn test_hidden_object() {
    let data = frag()
        .id(id("levels"))
        .eq()
        .open()
        .int(1)
        .int(2)
        .int(3)
        .eq()
        .int(4)
        .int(5)
        .close()
        .build();
    assert_eq!(
        decode_fragment(&data, tokens()).unwrap(),
        r#"{"levels":[1,2,{"3":4},5]}"#
    );
}

#[test]
fn test_flatten_duplicate_keys() {
    let data = frag()
        .open()
        .id(id("triggered_event"))
        .eq()
        .open()
        .close()
        .id(id("triggered_event"))
        .eq()
        .open()
        .close()
        .close()
        .build();
    assert_eq!(
        decode_fragment(&data, tokens()).unwrap(),
        r#"{"triggered_event":[{},{}]}"#
    );
}

#[rstest]
#[case("dates", frag().open().close(), r#"{"meta_data":{"dates":{},"5":6}}"#)]
#[case("date", frag().quoted("x"), r#"{"meta_data":{"date":"x","5":6}}"#)]
#[case("birth", frag().unquoted("x"), r#"{"meta_data":{"birth":"x","5":6}}"#)]
fn test_date_key_flags_end_with_value(
    #[case] key: &str,
    #[case] value: FragmentBuilder,
    #[case] expected: &str,
) {
    let data = frag()
        .id(id("meta_data"))
        .eq()
        .open()
        .id(id(key))
        .eq()
        .raw(&value.build())
        .int(5)
        .eq()
        .int(6)
        .close()
        .build();
    assert_eq!(decode_fragment(&data, tokens()).unwrap(), expected);
}

#[test]
fn test_meta_fragment() {
    let data = meta_fragment();
    assert_eq!(decode_fragment(&data, tokens()).unwrap(), META_JSON);
}

#[test]
fn test_truncated_fragment() {
    let data = meta_fragment();
    let err = decode_fragment(&data[..data.len() - 1], tokens()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Eof { .. }));
}

fn save_bytes() -> Vec<u8> {
    let mut data = b"SAV0103b1a5c7230000a14e\n".to_vec();
    data.extend(meta_fragment());
    data
}

fn expected_save_json() -> String {
    format!(
        r#"{{"checksum":"SAV0103b1a5c7230000a14e",{}"#,
        &META_JSON[1..]
    )
}

fn parse_in_two(data: &[u8], split: usize) -> String {
    let mut writer = JsonWriter::new(Vec::new());
    writer.begin_object().unwrap();
    let mut parser = BinParser::new(ParseState::Checksum, tokens());
    let first = parser.parse_chunk(&data[..split], false, &mut writer).unwrap();
    assert!(first.consumed <= split);
    assert!(first.examined >= first.consumed);

    let second = parser
        .parse_chunk(&data[first.consumed..], true, &mut writer)
        .unwrap();
    assert_eq!(first.consumed + second.consumed, data.len());
    parser.finish(&mut writer).unwrap();
    writer.end_object().unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
}

#[test]
fn test_resumable_at_every_split() {
    let data = save_bytes();
    let expected = expected_save_json();
    for split in 0..=data.len() {
        assert_eq!(parse_in_two(&data, split), expected, "split at {}", split);
    }
}

/// Hands out a single byte per read
struct Trickle<'a>(&'a [u8]);

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match (self.0.split_first(), buf.first_mut()) {
            (Some((&x, rest)), Some(out)) => {
                *out = x;
                self.0 = rest;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(32 * 1024)]
fn test_decoder_buffer_sizes(#[case] buffer_len: usize) {
    let data = save_bytes();
    let decoder = Decoder::builder().buffer_len(buffer_len).build(tokens());
    let out = decoder.to_json_vec(Trickle(&data)).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), expected_save_json());

    let out = decoder.to_json_vec(&data[..]).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), expected_save_json());
}

#[test]
fn test_decoder_without_checksum() {
    let data = meta_fragment();
    let summary = Decoder::new(tokens())
        .decode(&data[..], &mut JsonWriter::new(Vec::new()))
        .unwrap();
    assert_eq!(summary.checksum, None);
    assert_eq!(summary.gamestate, None);
}

#[test]
fn test_decoder_trailing_garbage() {
    let mut data = save_bytes();
    data.push(0xff);
    let err = Decoder::new(tokens()).to_json_vec(&data[..]).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Eof { .. }));
}

#[test]
fn test_decoder_value() {
    let data = save_bytes();
    let value = Decoder::new(tokens()).to_value(&data[..]).unwrap();
    assert_eq!(value["meta_data"]["levels"][2]["3"], 4);
    assert_eq!(value["meta_data"]["meta_date"], "1436.1.1");
    assert_eq!(value["checksum"], "SAV0103b1a5c7230000a14e");
}

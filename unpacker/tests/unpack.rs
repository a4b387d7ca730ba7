use bytes::Bytes;
use pretty_assertions::assert_eq;
use swf_core::{tag::code, Compression, Fixed8, Movie, Rect, Sprite, Tag};
use unpacker::{
    locate::{Locators, WholePayload},
    trace::TraceError,
    unpack, UnpackConfig, UnpackError, Unpacker,
};

/// constant pool push, then "push a; getvariable; not" cut apart by two jump pairs
const MARKER: &str = concat!(
    "960300006100",
    "9902000500",
    "990200f0ff",
    "1c",
    "12",
    "9902001300",
    "990200efff"
);

/// declares the pool and jumps into the marker
const DO_ACTION: &str = concat!("88040001006100", "990200edff", "00");

const RECOVERED: &str = "880400010061009603000061001c1200";

fn tag(code: u16, payload: &str) -> Tag {
    Tag::new(code, hex::decode(payload).unwrap())
}

fn end() -> Tag {
    Tag::new(code::END, Bytes::new())
}

fn movie(compression: Compression, tags: Vec<Tag>) -> Movie {
    Movie {
        compression,
        version: 6,
        frame_size: Rect::new(0, 11000, 0, 8000),
        frame_rate: Fixed8::new(24, 0),
        frame_count: 1,
        tags,
    }
}

fn obfuscated(compression: Compression) -> Vec<u8> {
    movie(
        compression,
        vec![
            Tag::new(code::PADDING, Bytes::new()),
            tag(code::MARKER, MARKER),
            tag(code::DO_ACTION, DO_ACTION),
            end(),
        ],
    )
    .encode()
    .unwrap()
}

#[test]
fn restores_do_action() -> anyhow::Result<()> {
    let out = Movie::decode(&unpack(&obfuscated(Compression::None))?)?;
    assert_eq!(out.tags, vec![tag(code::DO_ACTION, RECOVERED), end()]);
    assert_eq!(out.version, 6);
    assert_eq!(out.frame_count, 1);
    Ok(())
}

#[test]
fn restores_compressed_movie() -> anyhow::Result<()> {
    let raw = unpack(&obfuscated(Compression::Zlib))?;
    assert_eq!(&raw[..3], b"CWS");
    let out = Movie::decode(&raw)?;
    assert_eq!(out.tags, vec![tag(code::DO_ACTION, RECOVERED), end()]);
    Ok(())
}

#[test]
fn untouched_without_markers() -> anyhow::Result<()> {
    let input = movie(
        Compression::None,
        vec![tag(code::DO_ACTION, "9603000061001c1200"), tag(9, "ffffff"), end()],
    );
    let raw = input.encode()?;
    assert_eq!(unpack(&raw)?, raw);
    Ok(())
}

#[test]
fn marker_without_successor() {
    let input = movie(
        Compression::None,
        vec![tag(code::DO_ACTION, "00"), tag(code::MARKER, MARKER)],
    )
    .encode()
    .unwrap();
    match unpack(&input) {
        Err(UnpackError::MissingSuccessor { code, path }) => {
            assert_eq!(code, 253);
            assert_eq!(path, "1");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn marker_before_unsupported_tag() {
    let input = movie(
        Compression::None,
        vec![tag(code::MARKER, MARKER), tag(code::DO_INIT_ACTION, DO_ACTION), end()],
    )
    .encode()
    .unwrap();
    match unpack(&input) {
        Err(UnpackError::NoLocator { code, path }) => {
            assert_eq!(code, 59);
            assert_eq!(path, "1");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn extra_locator() -> anyhow::Result<()> {
    let input = movie(
        Compression::None,
        vec![tag(code::MARKER, MARKER), tag(code::DO_INIT_ACTION, DO_ACTION), end()],
    );
    let mut locators = Locators::default();
    locators.register(code::DO_INIT_ACTION, Box::new(WholePayload));
    let mut unpacker = Unpacker::new(UnpackConfig::default()).with_locators(locators);

    let out = Movie::decode(&unpacker.unpack(&input.encode()?)?)?;
    assert_eq!(out.tags, vec![tag(code::DO_INIT_ACTION, RECOVERED), end()]);
    Ok(())
}

#[test]
fn nested_marker_without_successor() {
    let sprite = Sprite {
        id: 7,
        frame_count: 1,
        tags: vec![tag(code::MARKER, MARKER)],
    };
    let input = movie(
        Compression::None,
        vec![
            tag(code::DO_ACTION, "00"),
            Tag::new(code::DEFINE_SPRITE, sprite.encode().unwrap()),
            end(),
        ],
    )
    .encode()
    .unwrap();
    match unpack(&input) {
        Err(UnpackError::MissingSuccessor { path, .. }) => assert_eq!(path, "1/0"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn truncated_sprite_names_the_tag() {
    let input = movie(
        Compression::None,
        vec![
            tag(code::DO_ACTION, "00"),
            Tag::new(code::DEFINE_SPRITE, vec![0x07]),
            end(),
        ],
    )
    .encode()
    .unwrap();
    match unpack(&input) {
        Err(UnpackError::Tag { code, path, source }) => {
            assert_eq!(code, 39);
            assert_eq!(path, "1");
            assert!(matches!(*source, UnpackError::Format(_)));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn trace_failure_names_the_tag() {
    let input = movie(
        Compression::None,
        vec![tag(code::MARKER, MARKER), tag(code::DO_ACTION, "1200"), end()],
    )
    .encode()
    .unwrap();
    match unpack(&input) {
        Err(UnpackError::Tag { code, path, source }) => {
            assert_eq!(code, 12);
            assert_eq!(path, "1");
            assert!(matches!(
                *source,
                UnpackError::Trace(TraceError::EndOfStream { .. })
            ));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn nested_sprite() -> anyhow::Result<()> {
    let sprite = Sprite {
        id: 7,
        frame_count: 1,
        tags: vec![tag(code::MARKER, MARKER), tag(code::DO_ACTION, DO_ACTION), end()],
    };
    let input = movie(
        Compression::None,
        vec![Tag::new(code::DEFINE_SPRITE, sprite.encode()?), end()],
    );

    let mut unpacker = Unpacker::new(UnpackConfig::default());
    let out = Movie::decode(&unpacker.unpack(&input.encode()?)?)?;
    assert_eq!(out.tags.len(), 2);
    assert_eq!(out.tags[0].code, code::DEFINE_SPRITE);

    let sprite = Sprite::decode(&out.tags[0].data)?;
    assert_eq!(sprite.id, 7);
    assert_eq!(sprite.tags, vec![tag(code::DO_ACTION, RECOVERED), end()]);
    assert_eq!(unpacker.report().tags[0].path, vec![0, 1]);
    Ok(())
}

#[test]
fn custom_tag_codes() -> anyhow::Result<()> {
    let input = movie(
        Compression::None,
        vec![
            Tag::new(200, Bytes::new()),
            tag(201, MARKER),
            tag(code::DO_ACTION, DO_ACTION),
            Tag::new(code::PADDING, Bytes::new()),
            end(),
        ],
    );
    let mut unpacker = Unpacker::new(UnpackConfig {
        marker_code: 201,
        padding_code: 200,
        ..UnpackConfig::default()
    });
    let out = Movie::decode(&unpacker.unpack(&input.encode()?)?)?;
    // 255 is an ordinary tag now
    assert_eq!(
        out.tags,
        vec![
            tag(code::DO_ACTION, RECOVERED),
            Tag::new(code::PADDING, Bytes::new()),
            end()
        ]
    );
    Ok(())
}

#[test]
fn report() -> anyhow::Result<()> {
    let mut unpacker = Unpacker::new(UnpackConfig::default());
    unpacker.unpack(&obfuscated(Compression::None))?;

    let report = unpacker.report();
    assert_eq!(report.version, 6);
    assert_eq!(report.compression, "None");
    assert_eq!(report.tags.len(), 1);

    let entry = &report.tags[0];
    assert_eq!(entry.path, vec![2]);
    assert_eq!(entry.code, 12);
    assert_eq!(entry.layout, "whole-payload");
    assert_eq!(entry.original_size, 13);
    assert_eq!(entry.recovered_size, 16);

    let region = &entry.regions[0];
    assert_eq!(region.entry, 32);
    assert_eq!((region.body_start, region.body_end), (2, 20));
    assert_eq!(region.jump_pairs, 2);
    assert!(region.constant_pool);
    assert_eq!(region.recovered, 16);

    let yaml = report.to_yaml()?;
    assert!(yaml.contains("layout: whole-payload"));
    assert!(yaml.contains("jump_pairs: 2"));
    Ok(())
}

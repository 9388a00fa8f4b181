//! End-to-end `key` calls against the in-memory host.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hashudr_core::{CustomErrorEntry, HashAlgorithm, UdrConfig, UdrError, DEFAULT_ERROR_NAME};
use hashudr_host::memory::{Failure, MemoryHost};
use hashudr_host::{BlobId, MessageLayout, MessageWriter, RecordingStatus, SqlType};
use hashudr_udr::{HashUdr, KeyFunction};
use proptest::prelude::*;

// ─── Helpers ─────────────────────────────────────────────────────────

fn module() -> HashUdr {
    HashUdr::with_config(UdrConfig::default()).unwrap()
}

fn text_message(layout: &MessageLayout, selector: Option<i16>, value: Option<&[u8]>) -> Vec<u8> {
    let mut writer = MessageWriter::new(layout);
    if let Some(selector) = selector {
        writer.write_short(0, selector).unwrap();
    }
    if let Some(value) = value {
        writer.write_text(1, value).unwrap();
    }
    writer.into_bytes()
}

fn blob_message(layout: &MessageLayout, selector: Option<i16>, blob: BlobId) -> Vec<u8> {
    let mut writer = MessageWriter::new(layout);
    if let Some(selector) = selector {
        writer.write_short(0, selector).unwrap();
    }
    writer.write_blob_id(1, blob).unwrap();
    writer.into_bytes()
}

struct Call {
    host: Arc<MemoryHost>,
    status: Arc<RecordingStatus>,
}

impl Call {
    fn new(host: MemoryHost) -> Self {
        Self {
            host: Arc::new(host),
            status: Arc::new(RecordingStatus::new()),
        }
    }

    fn bind<'m>(&self, module: &'m HashUdr, layout: MessageLayout) -> KeyFunction<'m> {
        module
            .key_function(self.status.clone(), self.host.clone(), layout)
            .unwrap()
    }

    fn run(&self, function: &KeyFunction<'_>, message: &[u8]) -> Result<Option<String>, UdrError> {
        function.execute(self.status.clone(), self.host.clone(), message)
    }
}

fn md5() -> Option<i16> {
    Some(HashAlgorithm::Md5.selector())
}

// ─── Scenarios ───────────────────────────────────────────────────────

#[test]
fn md5_of_inline_varchar() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let layout = KeyFunction::varchar_input(32);
    let function = call.bind(&module, layout.clone());

    let key = call
        .run(&function, &text_message(&layout, md5(), Some(b"abc")))
        .unwrap();
    assert_eq!(key.as_deref(), Some("900150983cd24fb0d6963f7d28e17f72"));
    assert!(call.status.is_empty());
}

#[test]
fn crc32_of_inline_varchar() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let layout = KeyFunction::varchar_input(32);
    let function = call.bind(&module, layout.clone());

    let selector = Some(HashAlgorithm::Crc32.selector());
    let key = call
        .run(&function, &text_message(&layout, selector, Some(b"123456789")))
        .unwrap();
    assert_eq!(key.as_deref(), Some("cbf43926"));
}

#[test]
fn char_input_keeps_trailing_padding() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let layout = MessageLayout::builder()
        .field("HASH_METHOD", SqlType::Short, 0)
        .field("VAL", SqlType::Text, 5)
        .build();
    let function = call.bind(&module, layout.clone());

    let padded = call
        .run(&function, &text_message(&layout, md5(), Some(b"abc")))
        .unwrap();
    let expected = hashudr_digest::digest(HashAlgorithm::Md5, b"abc  ").unwrap();
    assert_eq!(padded, Some(expected));
}

#[test]
fn null_selector_raises_custom_error_when_defined() {
    let module = module();
    let call = Call::new(
        MemoryHost::new(1).with_custom_error(CustomErrorEntry::new(
            DEFAULT_ERROR_NAME,
            77_001,
            "hash computation failed",
        )),
    );
    let layout = KeyFunction::varchar_input(8);
    let function = call.bind(&module, layout.clone());

    let err = call
        .run(&function, &text_message(&layout, None, Some(b"x")))
        .unwrap_err();
    assert!(matches!(err, UdrError::InvalidAlgorithm(_)));

    let status = call.status.last().unwrap();
    assert_eq!(status.exception_number(), Some(77_001));
    assert_eq!(status.exception_name(), Some(DEFAULT_ERROR_NAME));
    assert_eq!(status.message(), Some(err.to_string().as_str()));
}

#[test]
fn null_selector_raises_generic_error_otherwise() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let layout = KeyFunction::varchar_input(8);
    let function = call.bind(&module, layout.clone());

    let err = call
        .run(&function, &text_message(&layout, None, Some(b"x")))
        .unwrap_err();
    assert!(matches!(err, UdrError::InvalidAlgorithm(_)));
    let status = call.status.last().unwrap();
    assert_eq!(status.exception_number(), None);
    assert_eq!(status.exception_name(), Some(DEFAULT_ERROR_NAME));
}

#[test]
fn declared_only_algorithm_is_unsupported_not_invalid() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let layout = KeyFunction::varchar_input(8);
    let function = call.bind(&module, layout.clone());

    let selector = Some(HashAlgorithm::Cshake128.selector());
    let unsupported = call
        .run(&function, &text_message(&layout, selector, Some(b"x")))
        .unwrap_err();
    let invalid = call
        .run(&function, &text_message(&layout, Some(0), Some(b"x")))
        .unwrap_err();

    assert!(matches!(unsupported, UdrError::UnsupportedAlgorithm { .. }));
    assert!(matches!(invalid, UdrError::InvalidAlgorithm(_)));
    let messages: Vec<_> = call
        .status
        .all()
        .iter()
        .map(|s| s.message().unwrap_or_default().to_string())
        .collect();
    assert_eq!(messages.len(), 2);
    assert_ne!(messages[0], messages[1]);
}

#[test]
fn out_of_range_selector_is_invalid() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let layout = KeyFunction::varchar_input(8);
    let function = call.bind(&module, layout.clone());
    for selector in [-1, 44, i16::MAX] {
        let err = call
            .run(&function, &text_message(&layout, Some(selector), Some(b"x")))
            .unwrap_err();
        assert!(matches!(err, UdrError::InvalidAlgorithm(_)), "{selector}");
    }
}

#[test]
fn null_value_short_circuits_for_every_selector() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let layout = KeyFunction::varchar_input(8);
    let function = call.bind(&module, layout.clone());

    let selectors = HashAlgorithm::ALL
        .iter()
        .map(|a| Some(a.selector()))
        .chain([None, Some(0), Some(-5)]);
    for selector in selectors {
        let key = call
            .run(&function, &text_message(&layout, selector, None))
            .unwrap();
        assert_eq!(key, None);
    }
    assert!(call.status.is_empty());
}

#[test]
fn text_in_other_character_set_is_rejected() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let layout = MessageLayout::builder()
        .field("HASH_METHOD", SqlType::Short, 0)
        .field("VAL", SqlType::Varying, 16)
        .char_set(4)
        .build();
    let function = call.bind(&module, layout.clone());
    let err = call
        .run(&function, &text_message(&layout, md5(), Some(b"abc")))
        .unwrap_err();
    assert!(matches!(err, UdrError::UnsupportedEncoding(_)));
}

#[test]
fn text_blob_is_rejected() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let blob = call.host.add_blob(b"abc".to_vec());
    let layout = MessageLayout::builder()
        .field("HASH_METHOD", SqlType::Short, 0)
        .field("VAL", SqlType::Blob, 0)
        .sub_type(1)
        .build();
    let function = call.bind(&module, layout.clone());
    let err = call
        .run(&function, &blob_message(&layout, md5(), blob))
        .unwrap_err();
    assert!(matches!(err, UdrError::UnsupportedEncoding(_)));
    assert_eq!(call.host.stats().blobs_opened, 0);
}

#[test]
fn numeric_value_is_unsupported_datatype() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let layout = MessageLayout::builder()
        .field("HASH_METHOD", SqlType::Short, 0)
        .field("VAL", SqlType::Int64, 0)
        .build();
    let function = call.bind(&module, layout.clone());
    let mut writer = MessageWriter::new(&layout);
    writer.write_short(0, 15).unwrap().write_int64(1, 42).unwrap();
    let err = call.run(&function, &writer.into_bytes()).unwrap_err();
    assert!(matches!(err, UdrError::UnsupportedDatatype(_)));
}

#[test]
fn blob_digest_equals_inline_digest() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let data: Vec<u8> = (0..100_000u32).map(|i| (i % 256) as u8).collect();
    let blob = call.host.add_blob(data.clone());

    let layout = KeyFunction::blob_input();
    let function = call.bind(&module, layout.clone());
    let selector = Some(HashAlgorithm::Sha2_256.selector());
    let key = call
        .run(&function, &blob_message(&layout, selector, blob))
        .unwrap();

    let expected = hashudr_digest::digest(HashAlgorithm::Sha2_256, &data).unwrap();
    assert_eq!(key, Some(expected));
    let stats = call.host.stats();
    assert_eq!(stats.blobs_opened, 1);
    assert_eq!(stats.blobs_closed, 1);
    assert_eq!(stats.blobs_cancelled, 0);
}

#[test]
fn blob_failure_releases_handle_and_raises() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let blob = call.host.add_blob(vec![7u8; 100_000]);
    call.host.inject(Failure::SegmentAfter(2));

    let layout = KeyFunction::blob_input();
    let function = call.bind(&module, layout.clone());
    let err = call
        .run(&function, &blob_message(&layout, md5(), blob))
        .unwrap_err();
    assert!(matches!(err, UdrError::BlobRead(_)));
    assert_eq!(call.host.stats().blobs_cancelled, 1);
    assert!(call.status.last().unwrap().message().unwrap().contains("blob"));
}

#[test]
fn transaction_is_refetched_per_call() {
    let module = module();
    let call = Call::new(MemoryHost::new(1));
    let blob = call.host.add_blob(b"abc".to_vec());
    let layout = KeyFunction::blob_input();
    let function = call.bind(&module, layout.clone());
    let before = call.host.stats().transaction_lookups;

    for _ in 0..3 {
        call.run(&function, &blob_message(&layout, md5(), blob)).unwrap();
    }
    assert_eq!(call.host.stats().transaction_lookups - before, 3);
}

#[test]
fn call_after_finalize_is_resources_undefined() {
    let module = module();
    let call = Call::new(MemoryHost::new(9));
    let layout = KeyFunction::varchar_input(8);
    let function = call.bind(&module, layout.clone());

    module.registry().finalize(function.connection_id());
    let err = call
        .run(&function, &text_message(&layout, md5(), Some(b"abc")))
        .unwrap_err();
    assert!(matches!(err, UdrError::ResourcesUndefined(_)));
    assert_eq!(call.status.last().unwrap().exception_number(), None);
}

#[test]
fn overlapping_calls_on_one_connection_keep_their_own_status() {
    const OPEN_DELAY: Duration = Duration::from_millis(150);
    let module = module();
    // Same attachment id, so both functions share one connection record.
    let slow = Call::new(MemoryHost::new(4).with_blob_open_delay(OPEN_DELAY));
    let fast = Call::new(MemoryHost::new(4));
    let blob = slow.host.add_blob(b"abc".to_vec());
    slow.host.inject(Failure::BlobOpen);

    let blob_layout = KeyFunction::blob_input();
    let text_layout = KeyFunction::varchar_input(8);
    let blob_fn = slow.bind(&module, blob_layout.clone());
    let text_fn = fast.bind(&module, text_layout.clone());
    assert_eq!(blob_fn.connection_id(), text_fn.connection_id());

    let started = Instant::now();
    let fast_elapsed = thread::scope(|s| {
        let failing = s.spawn(|| {
            slow.run(&blob_fn, &blob_message(&blob_layout, md5(), blob))
        });
        thread::sleep(Duration::from_millis(30));
        let succeeding = s.spawn(|| {
            let key = fast
                .run(&text_fn, &text_message(&text_layout, md5(), Some(b"abc")))
                .unwrap();
            (key, started.elapsed())
        });

        let err = failing.join().unwrap().unwrap_err();
        assert!(matches!(err, UdrError::BlobRead(_)));
        let (key, elapsed) = succeeding.join().unwrap();
        assert_eq!(key.as_deref(), Some("900150983cd24fb0d6963f7d28e17f72"));
        elapsed
    });

    // The second call waited for the first to leave the connection.
    assert!(fast_elapsed >= OPEN_DELAY, "{fast_elapsed:?}");
    assert_eq!(slow.status.len(), 1);
    assert!(slow.status.last().unwrap().message().unwrap().contains("blob"));
    assert!(fast.status.is_empty());
    assert_eq!(fast.host.stats().blobs_opened, 0);
}

#[test]
fn catalog_failure_fails_binding_then_recovers() {
    let module = module();
    let call = Call::new(MemoryHost::new(5));
    call.host.inject(Failure::Catalog { times: 1 });
    let layout = KeyFunction::varchar_input(8);

    let err = module
        .key_function(call.status.clone(), call.host.clone(), layout.clone())
        .unwrap_err();
    assert!(matches!(err, UdrError::CatalogQuery(_)));
    assert_eq!(call.status.len(), 1);

    let function = call.bind(&module, layout.clone());
    let key = call
        .run(&function, &text_message(&layout, md5(), Some(b"abc")))
        .unwrap();
    assert!(key.is_some());
}

#[test]
fn connections_do_not_share_custom_errors() {
    let module = module();
    let custom = Call::new(
        MemoryHost::new(1).with_custom_error(CustomErrorEntry::new(DEFAULT_ERROR_NAME, 5, "c")),
    );
    let plain = Call::new(MemoryHost::new(2));
    let layout = KeyFunction::varchar_input(8);
    let f1 = custom.bind(&module, layout.clone());
    let f2 = plain.bind(&module, layout.clone());

    let message = text_message(&layout, None, Some(b"x"));
    custom.run(&f1, &message).unwrap_err();
    plain.run(&f2, &message).unwrap_err();

    assert_eq!(custom.status.last().unwrap().exception_number(), Some(5));
    assert_eq!(plain.status.last().unwrap().exception_number(), None);
}

#[test]
fn parallel_connections_share_one_module() {
    let module = Arc::new(module());
    let handles: Vec<_> = (1..=8u64)
        .map(|n| {
            let module = Arc::clone(&module);
            thread::spawn(move || {
                let call = Call::new(MemoryHost::new(n));
                let layout = KeyFunction::varchar_input(8);
                let function = call.bind(&module, layout.clone());
                let value = n.to_string();
                let key = call
                    .run(&function, &text_message(&layout, md5(), Some(value.as_bytes())))
                    .unwrap();
                assert_eq!(key, Some(hashudr_digest::digest(HashAlgorithm::Md5, value.as_bytes()).unwrap()));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(module.registry().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn null_value_never_errors(selector in proptest::option::of(any::<i16>())) {
        let module = module();
        let call = Call::new(MemoryHost::new(1));
        let layout = KeyFunction::varchar_input(4);
        let function = call.bind(&module, layout.clone());
        let key = call.run(&function, &text_message(&layout, selector, None)).unwrap();
        prop_assert_eq!(key, None);
    }

    #[test]
    fn inline_key_matches_engine(value in proptest::collection::vec(any::<u8>(), 0..=64), idx in 0usize..43) {
        let algorithm = HashAlgorithm::ALL[idx];
        prop_assume!(algorithm.is_supported());
        let module = module();
        let call = Call::new(MemoryHost::new(1));
        let layout = KeyFunction::varchar_input(64);
        let function = call.bind(&module, layout.clone());
        let key = call
            .run(&function, &text_message(&layout, Some(algorithm.selector()), Some(&value)))
            .unwrap();
        prop_assert_eq!(key, Some(hashudr_digest::digest(algorithm, &value).unwrap()));
    }
}

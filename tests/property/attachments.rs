//! Property tests for attachment pre-checks.
//!
//! 1. A batch is accepted iff it fits the free slots and every file is a PDF.
//! 2. An oversized batch reports exactly the number of free slots.
//! 3. Accepted batches come back unchanged and in order.

use proptest::prelude::*;
use taskdesk::attachments::{ValidationError, validate_attachments};
use taskdesk_proto::task::{MAX_TASK_DOCUMENTS, PDF_MEDIA_TYPE, UploadFile};

fn arb_media_type() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => Just(PDF_MEDIA_TYPE.to_string()),
        1 => Just("text/plain".to_string()),
        1 => Just("image/png".to_string()),
        1 => Just("application/octet-stream".to_string()),
    ]
}

fn arb_upload() -> impl Strategy<Value = UploadFile> {
    ("[a-z]{1,8}", arb_media_type(), prop::collection::vec(any::<u8>(), 0..16))
        .prop_map(|(stem, media, content)| UploadFile::new(format!("{stem}.bin"), media, content))
}

proptest! {
    #[test]
    fn accepts_iff_fits_and_all_pdf(
        existing in 0usize..=MAX_TASK_DOCUMENTS,
        files in prop::collection::vec(arb_upload(), 0..6),
    ) {
        let fits = files.len() <= MAX_TASK_DOCUMENTS - existing;
        let all_pdf = files.iter().all(|f| f.media_type == PDF_MEDIA_TYPE);
        let result = validate_attachments(existing, files.clone());
        prop_assert_eq!(result.is_ok(), fits && all_pdf);
    }

    #[test]
    fn oversized_batch_reports_free_slots(
        existing in 0usize..=MAX_TASK_DOCUMENTS,
        extra in 1usize..4,
    ) {
        let free = MAX_TASK_DOCUMENTS - existing;
        let files: Vec<_> = (0..free + extra)
            .map(|i| UploadFile::pdf(format!("f{i}.pdf"), vec![0x25]))
            .collect();
        prop_assert_eq!(
            validate_attachments(existing, files),
            Err(ValidationError::TooManyFiles(free))
        );
    }

    #[test]
    fn accepted_batch_is_returned_in_order(
        names in prop::collection::vec("[a-z]{1,6}", 0..=MAX_TASK_DOCUMENTS),
    ) {
        let files: Vec<_> = names
            .iter()
            .map(|n| UploadFile::pdf(format!("{n}.pdf"), n.as_bytes().to_vec()))
            .collect();
        let accepted = validate_attachments(0, files.clone()).unwrap();
        prop_assert!(accepted == files);
    }
}

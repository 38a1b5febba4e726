//! Line reconstruction across arbitrary chunk boundaries.

use kodegen_tools_svn::LineReconstructor;

const OUTPUT: &str = "Updating '.':\r\nA    docs/ünïcödé.txt\nU    src/main.c\rSkipped 'x' -- Node remains in conflict\n\nUpdated to revision 42.\nPassword for 'alice': ";

fn collect(chunks: &[&[u8]]) -> (Vec<String>, Option<String>) {
    let mut lines = LineReconstructor::new();
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(lines.on_bytes_available(chunk));
    }
    (out, lines.finish())
}

#[test]
fn test_every_byte_split_yields_same_lines() {
    let bytes = OUTPUT.as_bytes();
    let expected = collect(&[bytes]);
    assert_eq!(expected.0.len(), 6);
    assert_eq!(expected.0[1], "A    docs/ünïcödé.txt");
    assert_eq!(expected.0[4], "");
    assert_eq!(expected.1.as_deref(), Some("Password for 'alice': "));

    for split in 0..=bytes.len() {
        let (head, tail) = bytes.split_at(split);
        assert_eq!(collect(&[head, tail]), expected, "split at byte {split}");
    }
}

#[test]
fn test_every_char_split_of_text() {
    let expected = {
        let mut lines = LineReconstructor::new();
        lines.on_text_available(OUTPUT)
    };
    for (split, _) in OUTPUT.char_indices() {
        let mut lines = LineReconstructor::new();
        let mut got = lines.on_text_available(&OUTPUT[..split]);
        got.extend(lines.on_text_available(&OUTPUT[split..]));
        assert_eq!(got, expected, "split at char boundary {split}");
    }
}

#[test]
fn test_pending_prompt_is_visible_before_newline() {
    let mut lines = LineReconstructor::new();
    assert!(lines.on_text_available("Username: ").is_empty());
    assert_eq!(lines.pending(), "Username: ");
    lines.clear_pending();
    assert_eq!(lines.finish(), None);
}

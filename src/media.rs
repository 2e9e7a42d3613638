//! Text and audio helpers for narration.

const SENTENCE_ENDS: [char; 6] = ['。', '！', '？', '.', '!', '?'];

/// Split `text` into chunks of at most `max_chars` characters for a
/// text-to-speech request.
///
/// Sentences end at `。！？.!?` (kept) or a newline (dropped). Whole
/// sentences are packed greedily; a sentence longer than the limit is cut on
/// character boundaries.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences(text) {
        let len = sentence.chars().count();
        if current_len + len <= max_chars {
            current.push_str(&sentence);
            current_len += len;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if len <= max_chars {
            current = sentence;
            current_len = len;
            continue;
        }
        let chars: Vec<char> = sentence.chars().collect();
        for piece in chars.chunks(max_chars) {
            if piece.len() == max_chars {
                chunks.push(piece.iter().collect());
            } else {
                current = piece.iter().collect();
                current_len = piece.len();
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut sentence = String::new();
    for c in text.chars() {
        if c == '\n' || c == '\r' {
            flush_sentence(&mut sentence, &mut out);
            continue;
        }
        sentence.push(c);
        if SENTENCE_ENDS.contains(&c) {
            flush_sentence(&mut sentence, &mut out);
        }
    }
    flush_sentence(&mut sentence, &mut out);
    out
}

fn flush_sentence(sentence: &mut String, out: &mut Vec<String>) {
    let trimmed = sentence.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    sentence.clear();
}

/// Length of a leading ID3v2 tag, if any.
fn id3_len(buf: &[u8]) -> usize {
    if buf.len() < 10 || &buf[..3] != b"ID3" {
        return 0;
    }
    let size = buf[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b & 0x7f) as usize);
    let footer = if buf[5] & 0x10 != 0 { 10 } else { 0 };
    (10 + size + footer).min(buf.len())
}

/// Join encoded audio segments (one per TTS chunk) into a single stream.
///
/// The first segment is kept whole; leading ID3v2 tags on later segments are
/// dropped so the result carries a single tag.
pub fn concat_audio<B: AsRef<[u8]>>(segments: &[B]) -> Vec<u8> {
    let total = segments.iter().map(|s| s.as_ref().len()).sum();
    let mut out = Vec::with_capacity(total);
    for (i, segment) in segments.iter().enumerate() {
        let bytes = segment.as_ref();
        let skip = if i == 0 { 0 } else { id3_len(bytes) };
        out.extend_from_slice(&bytes[skip..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packs_sentences_up_to_limit() {
        let chunks = split_for_tts("第一句。第二句！第三句？", 8);
        assert_eq!(chunks, vec!["第一句。第二句！", "第三句？"]);
    }

    #[test]
    fn test_newlines_break_sentences() {
        let chunks = split_for_tts("Hello there\nGeneral Kenobi.", 20);
        assert_eq!(chunks, vec!["Hello there", "General Kenobi."]);
    }

    #[test]
    fn test_long_sentence_is_hard_split() {
        let chunks = split_for_tts("一二三四五六七八九十。", 4);
        assert_eq!(chunks, vec!["一二三四", "五六七八", "九十。"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[test]
    fn test_remainder_of_hard_split_packs_with_next() {
        let chunks = split_for_tts("abcdef. g.", 5);
        assert_eq!(chunks, vec!["abcde", "f.g."]);
    }

    #[test]
    fn test_empty_text() {
        assert!(split_for_tts("", 100).is_empty());
        assert!(split_for_tts(" \n \n", 100).is_empty());
    }

    #[test]
    fn test_concat_drops_later_id3_tags() {
        let tag = [b'I', b'D', b'3', 4, 0, 0, 0, 0, 0, 2, 0xAA, 0xBB];
        let mut first = tag.to_vec();
        first.extend_from_slice(b"one");
        let mut second = tag.to_vec();
        second.extend_from_slice(b"two");

        let joined = concat_audio(&[first.clone(), second]);
        let mut expected = first;
        expected.extend_from_slice(b"two");
        assert_eq!(joined, expected);
    }

    #[test]
    fn test_concat_plain_segments() {
        assert_eq!(concat_audio(&[b"ab".as_slice(), b"cd".as_slice()]), b"abcd");
        assert!(concat_audio::<Vec<u8>>(&[]).is_empty());
    }
}

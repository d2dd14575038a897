//! Message splitting for Slack.
//!
//! Slack renders at most ~4000 characters per message section, so longer
//! celebration texts are posted as consecutive messages split at line
//! boundaries.

/// Maximum characters per posted message.
const CHUNK_MAX: usize = 4000;

/// Split `text` into posting-sized chunks at line boundaries. A single line
/// longer than the limit is force-split at the last space that fits.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.len() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        let cost = if current.is_empty() {
            line.len()
        } else {
            1 + line.len()
        };
        if !current.is_empty() && current.len() + cost > CHUNK_MAX {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    // Force-split any chunk that is still too large (one giant line).
    let mut result = Vec::new();
    for chunk in chunks {
        if chunk.len() <= CHUNK_MAX {
            result.push(chunk);
            continue;
        }
        let mut remaining = chunk.as_str();
        while remaining.len() > CHUNK_MAX {
            // Generated text is full of emoji and other multibyte
            // characters; never slice inside one.
            let mut end = CHUNK_MAX;
            while !remaining.is_char_boundary(end) {
                end -= 1;
            }
            let split_at = remaining[..end]
                .rfind(' ')
                .filter(|&i| i > 0)
                .unwrap_or(end);
            result.push(remaining[..split_at].to_string());
            remaining = remaining[split_at..].trim_start();
        }
        if !remaining.is_empty() {
            result.push(remaining.to_string());
        }
    }

    result
}

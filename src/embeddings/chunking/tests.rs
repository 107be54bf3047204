use super::*;

#[test]
fn empty_text_produces_no_chunks() {
    let chunks = chunk_document("f1", "empty.txt", "", &ChunkingConfig::default());
    assert!(chunks.is_empty());

    let chunks = chunk_document("f1", "blank.txt", "\n\n  \n\n", &ChunkingConfig::default());
    assert!(chunks.is_empty());
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = chunk_document(
        "f1",
        "notes.txt",
        "One paragraph.\n\nAnother paragraph.",
        &ChunkingConfig::default(),
    );

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[0].content, "One paragraph.\n\nAnother paragraph.");
    assert_eq!(chunks[0].file_id, "f1");
    assert_eq!(chunks[0].file_name, "notes.txt");
}

#[test]
fn long_documents_split_at_paragraph_boundaries() {
    let paragraph = "x".repeat(400);
    let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");

    let config = ChunkingConfig {
        max_chunk_chars: 1000,
    };
    let chunks = chunk_document("f1", "long.txt", &text, &config);

    assert_eq!(chunks.len(), 2);
    // Two paragraphs fit under the limit, the third starts a new chunk
    assert_eq!(chunks[0].content.len(), 802);
    assert_eq!(chunks[1].content.len(), 400);
}

#[test]
fn chunk_indexes_are_sequential() {
    let paragraph = "y".repeat(600);
    let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");

    let config = ChunkingConfig {
        max_chunk_chars: 1000,
    };
    let chunks = chunk_document("f1", "seq.txt", &text, &config);

    let indexes: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indexes, [0, 1, 2]);
}

#[test]
fn oversized_paragraph_stays_whole() {
    let paragraph = "z".repeat(5000);

    let config = ChunkingConfig {
        max_chunk_chars: 1000,
    };
    let chunks = chunk_document("f1", "big.txt", &paragraph, &config);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content.len(), 5000);
}

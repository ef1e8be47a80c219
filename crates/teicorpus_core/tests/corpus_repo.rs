use teicorpus_core::db::open_db_in_memory;
use teicorpus_core::{
    CorpusRepository, NewPhraseme, NewWord, PhrasemeWordLink, SqliteCorpusRepository,
    TextMetadata,
};

fn word(text_id: i64, xml_id: &str, concept_id: Option<i64>) -> NewWord {
    NewWord {
        text_id,
        xml_id: xml_id.to_string(),
        occurrence: format!("occ-{xml_id}"),
        lemma: Some("lemma".to_string()),
        concept_id,
        context: String::new(),
    }
}

#[test]
fn word_lookup_is_scoped_to_its_text() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCorpusRepository::try_new(&conn).unwrap();
    let first = repo.create_text(&TextMetadata::default()).unwrap();
    let second = repo.create_text(&TextMetadata::default()).unwrap();

    let w1 = repo.create_word(&word(first, "w1", None)).unwrap();
    let w1_other = repo.create_word(&word(second, "w1", None)).unwrap();

    assert_ne!(w1, w1_other);
    assert_eq!(repo.find_word_by_stable_id(first, "w1").unwrap(), Some(w1));
    assert_eq!(
        repo.find_word_by_stable_id(second, "w1").unwrap(),
        Some(w1_other)
    );
    assert_eq!(repo.find_word_by_stable_id(first, "w2").unwrap(), None);
}

#[test]
fn duplicate_stable_id_within_text_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCorpusRepository::try_new(&conn).unwrap();
    let text = repo.create_text(&TextMetadata::default()).unwrap();

    repo.create_word(&word(text, "w1", None)).unwrap();
    assert!(repo.create_word(&word(text, "w1", None)).is_err());
}

#[test]
fn duplicate_concept_url_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCorpusRepository::try_new(&conn).unwrap();

    let id = repo.create_concept("http://x/c").unwrap();
    assert!(repo.create_concept("http://x/c").is_err());
    assert_eq!(repo.find_concept_by_url("http://x/c").unwrap(), Some(id));
    assert_eq!(repo.find_concept_by_url("http://x/other").unwrap(), None);
}

#[test]
fn deleting_text_cascades_to_words_phrasemes_and_links() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCorpusRepository::try_new(&conn).unwrap();
    let text = repo.create_text(&TextMetadata::default()).unwrap();
    let w1 = repo.create_word(&word(text, "w1", None)).unwrap();
    let phraseme = repo
        .create_phraseme(&NewPhraseme {
            text_id: text,
            normalized_form: "w1".to_string(),
            concept_url: None,
        })
        .unwrap();
    repo.create_phraseme_word_link(&PhrasemeWordLink {
        phraseme_id: phraseme,
        word_id: w1,
        position: 1,
    })
    .unwrap();

    conn.execute("DELETE FROM texts WHERE id = ?1;", [text])
        .unwrap();

    let stats = repo.corpus_stats().unwrap();
    assert_eq!(stats.texts, 0);
    assert_eq!(stats.words, 0);
    assert_eq!(stats.phrasemes, 0);
    assert_eq!(stats.phraseme_words, 0);
}

#[test]
fn deleting_concept_detaches_words() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCorpusRepository::try_new(&conn).unwrap();
    let text = repo.create_text(&TextMetadata::default()).unwrap();
    let concept = repo.create_concept("http://x/c").unwrap();
    repo.create_word(&word(text, "w1", Some(concept))).unwrap();

    conn.execute("DELETE FROM concepts WHERE id = ?1;", [concept])
        .unwrap();

    let words = repo.list_words(text).unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].concept_id, None);
}

#[test]
fn phraseme_position_is_unique_per_phraseme() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCorpusRepository::try_new(&conn).unwrap();
    let text = repo.create_text(&TextMetadata::default()).unwrap();
    let w1 = repo.create_word(&word(text, "w1", None)).unwrap();
    let w2 = repo.create_word(&word(text, "w2", None)).unwrap();
    let phraseme = repo
        .create_phraseme(&NewPhraseme {
            text_id: text,
            normalized_form: "w1 w2".to_string(),
            concept_url: Some("http://x/p".to_string()),
        })
        .unwrap();

    repo.create_phraseme_word_link(&PhrasemeWordLink {
        phraseme_id: phraseme,
        word_id: w1,
        position: 1,
    })
    .unwrap();
    let clash = repo.create_phraseme_word_link(&PhrasemeWordLink {
        phraseme_id: phraseme,
        word_id: w2,
        position: 1,
    });
    assert!(clash.is_err());

    let phrasemes = repo.list_phrasemes(text).unwrap();
    assert_eq!(phrasemes.len(), 1);
    assert_eq!(phrasemes[0].concept_url.as_deref(), Some("http://x/p"));
}

#[test]
fn metadata_round_trips_through_texts() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCorpusRepository::try_new(&conn).unwrap();
    let metadata = TextMetadata {
        author: "Anon".to_string(),
        title: "Chronicle".to_string(),
        not_before: "1100".to_string(),
        not_after: "1150".to_string(),
    };
    let text = repo.create_text(&metadata).unwrap();

    let (author, title, not_before, not_after): (String, String, String, String) = conn
        .query_row(
            "SELECT author, title, not_before, not_after FROM texts WHERE id = ?1;",
            [text],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!(author, "Anon");
    assert_eq!(title, "Chronicle");
    assert_eq!(not_before, "1100");
    assert_eq!(not_after, "1150");
}

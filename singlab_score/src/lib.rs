// Score to full-context label producer.
//
// Reads a note list with lyrics (`Score`), looks every lyric up in a
// `singlab_lexicon::PhonemeTable`, and writes a label `Sequence` with only the
// current windows filled. `singlab_label::propagate` completes it.
//
// Architecture:
// - score.rs: `Score` and `NoteEvent`, loaded from JSON
// - compose.rs: `compose`, the score to sequence expansion
// - main.rs: the `singlab` command line tool (fill, check, compose, exports)

pub mod compose;
pub mod score;

pub use compose::{ComposeError, compose};
pub use score::{NoteEvent, Score, ScoreError};

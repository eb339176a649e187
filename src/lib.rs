// daily-sentence - Korean sentence study cards (English, Japanese, Chinese)

pub mod study;

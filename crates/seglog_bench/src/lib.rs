//! Criterion benches for `seglog_core`; see `benches/`.

// Source indexing and match finding for delta creation.
//
// - `config`   - window size / search depth and their validation
// - `rolling`  - two-sum rolling hash over a fixed window
// - `table`    - source block index with collision chains
// - `extend`   - forward / backward match extension (SIMD with scalar fallback)
// - `matching` - the greedy encoder scan producing instructions

pub mod config;
pub mod extend;
pub mod matching;
pub mod rolling;
pub mod table;

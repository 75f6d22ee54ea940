/// `meta` entry holding the last assigned question sequence number.
pub const QUESTION_SEQ: &str = "question_seq";

/// Sequence numbers are zero-padded so sled's lexicographic order is
/// insertion order.
pub fn question_key(seq: u64) -> String {
    format!("{:020}", seq)
}

/// Human-facing identifier of the `seq`-th stored question.
pub fn question_id(seq: u64) -> String {
    format!("id_{}", seq)
}

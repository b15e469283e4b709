pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const PREAMBLE: &str = "You are a helpful assistant. Answer the following question based ONLY on the context provided below.\n\
If the answer is not in the context, state that you cannot find the answer in the document.\n\n";

pub fn build_context<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!("{PREAMBLE}CONTEXT:\n{context}\n\nQUESTION:\n{question}\n\nANSWER:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_joins_chunks_in_order() {
        let context = build_context(&["first", "second", "third"]);
        assert_eq!(context, "first\n\n---\n\nsecond\n\n---\n\nthird");
        assert_eq!(build_context::<&str>(&[]), "");
    }

    #[test]
    fn prompt_places_context_before_question() {
        let prompt = build_prompt("the sky is green", "What colour is the sky?");
        assert!(prompt.starts_with("You are a helpful assistant."));
        assert!(prompt.contains("based ONLY on the context"));

        let context_at = prompt.find("CONTEXT:\nthe sky is green").expect("context block");
        let question_at = prompt
            .find("QUESTION:\nWhat colour is the sky?")
            .expect("question block");
        assert!(context_at < question_at);
        assert!(prompt.ends_with("ANSWER:"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt("a", "b"), build_prompt("a", "b"));
    }
}

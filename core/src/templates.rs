/// Quick-start prompts offered on an empty transcript.
pub const PROMPT_TEMPLATES: [&str; 8] = [
    "Explain quantum computing in simple terms",
    "Write a creative story about time travel",
    "Help me plan a healthy meal for the week",
    "What are the latest trends in web development?",
    "Give me tips for improving productivity",
    "Explain the concept of machine learning",
    "How can I improve my communication skills?",
    "What are some good books to read this year?",
];

/// Look up a template by its 1-based position in the menu.
pub fn template(number: usize) -> Option<&'static str> {
    number
        .checked_sub(1)
        .and_then(|index| PROMPT_TEMPLATES.get(index))
        .copied()
}

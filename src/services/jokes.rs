use rand::seq::SliceRandom;

pub trait JokeSource: Send + Sync {
    fn joke(&self) -> String;
}

const JOKES: &[&str] = &[
    "Why do programmers prefer dark mode? Because light attracts bugs.",
    "There are only 10 kinds of people in this world: those who know binary and those who don't.",
    "A SQL query walks into a bar, walks up to two tables and asks, can I join you?",
    "I would tell you a UDP joke, but you might not get it.",
    "Why did the programmer quit his job? Because he didn't get arrays.",
    "How many programmers does it take to change a light bulb? None, that's a hardware problem.",
    "Debugging is like being the detective in a crime movie where you are also the murderer.",
    "The best thing about a boolean is that even if you are wrong, you are only off by a bit.",
    "To understand what recursion is, you must first understand what recursion is.",
    "Why do Java developers wear glasses? Because they don't see sharp.",
    "Knock knock. Race condition. Who's there?",
    "I've got a really good UDP joke to tell you, but I don't know if you'll get it.",
];

/// One-liners bundled with the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinJokes;

impl JokeSource for BuiltinJokes {
    fn joke(&self) -> String {
        JOKES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("I forgot the punchline.")
            .to_string()
    }
}

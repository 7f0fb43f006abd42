//! Built-in sample document
//!
//! Lets a user try the question flow without a PDF at hand.

use crate::chunking::Chunk;

/// Display name of the sample document
pub const SAMPLE_NAME: &str = "Gemini API FAQ.pdf";

const SAMPLE_TEXTS: [&str; 6] = [
    "Gemini is a family of generative AI models, developed by Google, that allows developers to generate content and solve problems.",
    "These multimodal models can process information from text, code, images, and video. This guide provides information about Gemini models, and guidance on how to use them in your applications.",
    "The Gemini 1.0 model is available in two sizes: Gemini 1.0 Pro model - The mid-size and most capable model in the Gemini 1.0 release. It's designed to handle a wide range of tasks and is the recommended model for most use cases. Gemini 1.0 Pro has a 32K context window for text, and is available in 180+ countries and territories through the Gemini API.",
    "Safety is a key priority for Google. The models have been tested and evaluated for safety, and the API includes safety filters to block harmful content. You can learn more about the safety features in the safety guide.",
    "To use the Gemini API, you need an API key. You can create a key with one click in Google AI Studio. The API is free to use for now, with rate limits.",
    "You can interact with Gemini models using the Google AI Studio, or by making calls to the Gemini API from your applications. You can use the Gemini API with a variety of programming languages, including Python, Go, Node.js, and Dart (Flutter).",
];

/// The pre-chunked sample document
pub fn sample_chunks() -> Vec<Chunk> {
    SAMPLE_TEXTS
        .iter()
        .enumerate()
        .map(|(i, text)| Chunk::new(i, *text))
        .collect()
}

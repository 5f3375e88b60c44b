pub mod extraction; // TextSource resolver: OCR client + confidence gate
pub mod structuring; // Extraction client: schema-constrained LLM call + outcome parsing
pub mod safety; // Hallucination guardrail
pub mod processor; // Pipeline orchestrator

// All LLM prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;

/// Structure prompt template. Replace `{input_sections}`, `{template_style}` and
/// `{slide_count_text}` before sending.
pub const STRUCTURE_PROMPT_TEMPLATE: &str = r#"Create a professional presentation based on the following information:

{input_sections}

The presentation should follow the {template_style} style and be structured as follows:

1. Title slide with an engaging headline
2. Introduction slides (1-2)
3. Main content slides (3-6)
4. Summary/conclusion slide{slide_count_text}

For each slide, provide:
- A concise title
- 3-5 bullet points of content (except for title slide)
- A dedicated image_prompt field with a detailed description for AI image generation (10-20 words)

IMPORTANT REQUIREMENTS:
1. ALWAYS include a detailed "image_prompt" field for EVERY slide
2. The image_prompt should describe a relevant, high-quality image that complements the slide content
3. Make image_prompt detailed enough for AI image generation (what to show, style, mood, colors)
4. It is CRITICAL that you include bullet points for each content slide

Format your response STRICTLY as a JSON object with the following structure:
{
  "slides": [
    {
      "type": "title",
      "title": "Slide Title Here",
      "subtitle": "Optional Subtitle Here",
      "image_prompt": "Detailed image description for generation"
    },
    {
      "type": "content",
      "title": "Slide Title Here",
      "bullets": ["Bullet point 1", "Bullet point 2", "Bullet point 3"],
      "image_prompt": "Detailed image description for generation"
    }
  ]
}

Other slide types you may use: "quote" (with "quote" and "author"), "image" (with a
"content" caption) and "two-column" (with "left_content" and "right_content").

Make sure:
- Every slide has the "image_prompt" field with a detailed visual description
- Every content slide has the "bullets" field with an array of bullet points
- The image prompts are descriptive and specific for high-quality generation
"#;

/// Builds the structure prompt sent to the text model.
pub fn build_structure_prompt(
    prompt: Option<&str>,
    document_text: Option<&str>,
    template_style: &str,
    slide_count: Option<u32>,
) -> String {
    let mut sections = Vec::with_capacity(2);
    if let Some(prompt) = prompt {
        sections.push(format!("INPUT TEXT: {prompt}"));
    }
    if let Some(document_text) = document_text {
        sections.push(format!("DOCUMENT CONTENT: {document_text}"));
    }

    let slide_count_text = slide_count
        .map(|n| format!("\nCreate a presentation with approximately {n} slides in total."))
        .unwrap_or_default();

    let input_sections = sections.join("\n\n");
    let mut full = fill_template(
        STRUCTURE_PROMPT_TEMPLATE,
        &[
            ("template_style", template_style),
            ("slide_count_text", &slide_count_text),
            ("input_sections", &input_sections),
        ],
    );
    full.push('\n');
    full.push_str(JSON_ONLY_INSTRUCTION);
    full
}

/// Substitutes `{key}` placeholders in a single pass. Inserted values are never rescanned,
/// and braces that do not name a key are kept as they are.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let matched = values.iter().find(|(key, _)| {
            tail.strip_prefix(key)
                .is_some_and(|after| after.starts_with('}'))
        });
        match matched {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

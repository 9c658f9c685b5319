pub fn build_entity_prompt(chunk_text: &str) -> String {
    format!(
        r#"Extract all domain-relevant entities from the following text.

INSTRUCTIONS:
1. Identify key entities (diseases, treatments, drugs, organizations, concepts, processes)
2. Output ONLY valid JSON, nothing else
3. Use the exact schema below

SCHEMA:
{{
  "entities": [
    {{"name": "EntityName", "type": "EntityType", "relation": "optional free-text hint or null"}}
  ]
}}

RULES:
- "name" is the surface form exactly as it appears in the text
- "type" is a short label such as Disease, Drug, Process, Organization
- "relation" may describe how the entity relates to the topic, or be null
- Output ONLY the JSON object, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}

pub fn build_relation_prompt(chunk_text: &str) -> String {
    format!(
        r#"Extract all entity-entity relationships from the following text.

INSTRUCTIONS:
1. Identify pairs of entities that are directly related
2. Output ONLY valid JSON, nothing else
3. Use the exact schema below

SCHEMA:
{{
  "relations": [
    {{"entity1": "Name", "entity2": "Name", "relation_type": "verb_phrase", "confidence": 0.0}}
  ]
}}

RULES:
- "relation_type" should be a verb: "treats", "causes", "prevents", "contains", etc.
- "confidence" is a number between 0 and 1, or null if unknown
- Entity names must match their surface form in the text
- Output ONLY the JSON object, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}

//! Prompt templates for Podscript.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub analysis: AnalysisPrompts,
    pub script: ScriptPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for content analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a content analyst preparing source material for a single-host podcast episode. You find the ideas worth discussing, in the order a listener should hear them, and you always answer with valid JSON."#
                .to_string(),

            user: r#"Analyze the following text and prepare it to be discussed on a podcast.

Identify:
1. The main theme (one sentence describing the core topic and what aspects it covers)
2. The overall tone and style of the text
3. Who the text is written for
4. At most {{max_chapters}} chapters: distinct ideas or themes worth a segment of the episode, in the order they should be discussed

For each chapter provide:
- "title": a short title (3-8 words)
- "summary": 2-3 sentences on what the segment should explore
- "key_points": 3-5 specific points to discuss

Text:
{{source}}

Respond with a single JSON object and nothing else, for example:
{
  "theme": "How coffee shaped trade and social life",
  "tone": "curious and anecdotal",
  "audience": "general listeners interested in history",
  "chapters": [
    {"title": "The Ethiopian Origins", "summary": "Where coffee came from and the legends around its discovery.", "key_points": ["Kaldi legend", "Sufi monasteries", "Early trade routes"]}
  ]
}"#
            .to_string(),
        }
    }
}

/// Prompts for the script generation stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptPrompts {
    /// System instruction shared by every script stage.
    pub system: String,
    /// Full-episode draft covering every chapter.
    pub draft: String,
    /// Single-chapter draft, used in sectioned mode.
    pub section: String,
    pub elaborate: String,
    pub polish: String,
}

impl Default for ScriptPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an experienced podcast scriptwriter. You write natural spoken narration for a single host, ready to be read aloud as is."#
                .to_string(),

            draft: r#"Write a complete podcast episode script for "{{podcast_name}}", hosted by {{host_name}}.

STYLE: {{style}}
CENTRAL THEME: {{theme}}

Cover each of these chapters in this exact order, one segment per chapter:
{{chapters}}

SOURCE MATERIAL (use for examples and quotes, do not just summarize it):
{{source_excerpt}}

Guidelines:
- Open with a hook and a short welcome from {{host_name}}
- Explore the ideas in each chapter; use the source as illustration
- Speak directly to the listener, ask rhetorical questions, vary sentence length
- Build smooth transitions between segments
- Close with a reflection and sign-off for {{podcast_name}}
- Output only the spoken script, with no speaker labels, stage directions or markdown"#
                .to_string(),

            section: r#"Write one segment of the podcast "{{podcast_name}}", hosted by {{host_name}}.

STYLE: {{style}}
EPISODE THEME: {{theme}}

SEGMENT {{section_number}} OF {{section_count}}: {{title}}
FOCUS: {{summary}}

KEY POINTS TO DISCUSS:
{{key_points}}

SOURCE MATERIAL (use as examples, not to summarize):
{{source_excerpt}}

Structure the segment as a hook, an explanation of the idea, examples from the source, implications, and a transition to what comes next.
Output only the spoken script, with no speaker labels, stage directions or markdown."#
                .to_string(),

            elaborate: r#"Expand the following podcast script.

STYLE: {{style}}

- Add concrete examples, analogies and supporting detail to every segment
- Deepen the explanations where the script moves too quickly
- Keep the order of segments, the host's voice and the overall structure
- Output the complete expanded script only, with no commentary

SCRIPT:
{{script}}"#
                .to_string(),

            polish: r#"Polish this podcast transcript by:

1. Fixing any grammatical errors or awkward phrasing
2. Improving sentence flow and readability for spoken delivery
3. Removing any redundancy or repetitive explanations
4. Ensuring consistent tone throughout
5. Strengthening the opening hook and closing reflection
6. Ensuring smooth transitions between topics and sections

CRITICAL INSTRUCTIONS:
- Output ONLY the refined transcript text itself
- Do NOT add meta-commentary (like "Here is the polished version")
- Do NOT add stage directions, sound cues, or text in parentheses/asterisks
- Do NOT add speaker labels like "HOST:" or "NARRATOR:"
- Do NOT add markdown formatting
- Keep the same overall length and structure

TRANSCRIPT TO POLISH:
{{script}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let analysis_path = custom_path.join("analysis.toml");
            if analysis_path.exists() {
                let content = std::fs::read_to_string(&analysis_path)?;
                prompts.analysis = toml::from_str(&content)?;
            }

            let script_path = custom_path.join("script.toml");
            if script_path.exists() {
                let content = std::fs::read_to_string(&script_path)?;
                prompts.script = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are substituted in a single pass, so `{{...}}` sequences inside
    /// substituted values are kept verbatim. Unknown placeholders are left as is.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        placeholder()
            .replace_all(template, |caps: &regex::Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.analysis.user.contains("{{max_chapters}}"));
        assert!(prompts.script.draft.contains("{{chapters}}"));
        assert!(prompts.script.polish.contains("{{script}}"));
        assert!(!prompts.analysis.system.is_empty());
        assert!(!prompts.script.system.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_substituted_values_are_not_rendered_again() {
        let mut vars = HashMap::new();
        vars.insert("style".to_string(), "warm".to_string());
        vars.insert(
            "script".to_string(),
            "write {{style}} in a template".to_string(),
        );

        for _ in 0..20 {
            let rendered = Prompts::render("Style: {{style}}\n{{script}}", &vars);
            assert_eq!(rendered, "Style: warm\nwrite {{style}} in a template");
        }
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let rendered = Prompts::render("{{known}} and {{unknown}}", &HashMap::from([(
            "known".to_string(),
            "yes".to_string(),
        )]));
        assert_eq!(rendered, "yes and {{unknown}}");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("host_name".to_string(), "Config Host".to_string());
        prompts
            .variables
            .insert("sponsor".to_string(), "Acme".to_string());

        let mut vars = HashMap::new();
        vars.insert("host_name".to_string(), "Alex".to_string());

        let rendered = prompts.render_with_custom("{{host_name}} thanks {{sponsor}}", &vars);
        assert_eq!(rendered, "Alex thanks Acme");
    }

    #[test]
    fn test_load_custom_script_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("script.toml"),
            "polish = \"Tighten this: {{script}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.script.polish, "Tighten this: {{script}}");
        // Fields missing from the file keep their defaults
        assert!(prompts.script.draft.contains("{{chapters}}"));
    }
}

//! Prompt templates for the content generation function

use serde::{Deserialize, Serialize};

/// What the editor asked the model to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Title,
    Excerpt,
    Content,
    Complete,
}

const EDITORIAL_VOICE: &str = "Sei il redattore del Commentarium, il blog di una società di consulenza \
     direzionale. Scrivi in italiano, con tono professionale, chiaro e concreto.";

impl GenerationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationKind::Title => "title",
            GenerationKind::Excerpt => "excerpt",
            GenerationKind::Content => "content",
            GenerationKind::Complete => "complete",
        }
    }

    /// System instruction sent ahead of the editor prompt
    pub fn system_prompt(self) -> String {
        let task = match self {
            GenerationKind::Title => {
                "Proponi un solo titolo efficace, massimo 80 caratteri. \
                 Rispondi solo con il titolo, senza virgolette."
            }
            GenerationKind::Excerpt => {
                "Scrivi un estratto di 2-3 frasi, massimo 300 caratteri. \
                 Rispondi solo con l'estratto."
            }
            GenerationKind::Content => {
                "Scrivi il corpo dell'articolo in HTML semantico (h2, h3, p, ul, li, strong). \
                 Non includere html, head, body né blocchi di codice markdown."
            }
            GenerationKind::Complete => {
                "Scrivi un articolo completo e rispondi ESATTAMENTE con questo formato:\n\
                 TITOLO: <titolo>\n\
                 ESTRATTO: <estratto di 2-3 frasi>\n\
                 SLUG: <slug-in-minuscolo-con-trattini>\n\
                 CONTENUTO_HTML:\n\
                 <corpo in HTML semantico>\n\
                 Non aggiungere altro testo prima o dopo."
            }
        };
        format!("{EDITORIAL_VOICE}\n\n{task}")
    }

    /// User message carrying the editor's brief
    pub fn user_prompt(self, brief: &str) -> String {
        format!("Argomento: {}", brief.trim())
    }
}

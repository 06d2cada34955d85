//! Prompt composition from the user's presentation choices.
//!
//! `PromptComposer::compose` is pure: the same selections always produce the
//! same text. The output is a fixed editorial directive followed by a details
//! block naming the category, the selected enhancements (catalog order,
//! comma-joined), the target aspect ratio and, when present, the user's own
//! instructions.
use crate::prompt::catalog::{AspectRatio, EnhancementOption, FoodCategory};

pub const BASE_DIRECTIVE: &str = "Transforme esta fotografia de alimento em uma imagem ultra profissional em estilo editorial gastronômico. Aplique iluminação de estúdio suave e difusa, realçando textura, brilho e frescor do alimento. Melhore as cores para torná-las mais vivas, naturais e apetitosas. Ajuste o enquadramento para composição perfeita, seguindo regras de fotografia gastronômica (como regra dos terços e foco seletivo). Crie um cenário sofisticado com ambientação realista, usando fundo com profundidade, elementos de mesa minimalistas e tons harmônicos que valorizem o prato. Aplique correção de perspectiva, nitidez avançada e tratamento premium. Mantenha o prato como protagonista absoluto. Resultado final: fotografia digna de revista gourmet, extremamente nítida, estética, elegante e profissional.";

const CLOSING_INSTRUCTION: &str = "Instruction: Generate a high-quality, photorealistic image based on the input image and the description above. Ensure the main food item remains the protagonist and looks exactly as described. Pay special attention to the user's custom instructions if provided.";

/// Borrowed view of the session fields that drive the prompt.
#[derive(Clone, Copy, Debug)]
pub struct Selections<'a> {
    pub category: Option<FoodCategory>,
    pub aspect_ratio: AspectRatio,
    pub enhancements: &'a [EnhancementOption],
    pub instructions: &'a str,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        PromptComposer
    }

    pub fn compose(&self, selections: &Selections<'_>) -> String {
        let category = selections.category.map(FoodCategory::label);
        let enhancements = selections
            .enhancements
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut lines = vec![
            format!("[CONTEXTO]: O usuário enviou uma foto de {}.", category.unwrap_or("alimento")),
            format!("[PROMPT PRINCIPAL]: {}", BASE_DIRECTIVE),
            "[DETALHES ESPECÍFICOS]:".to_string(),
            format!("- Tipo de Alimento: {}", category.unwrap_or_default()),
            format!("- Melhorias Solicitadas: {}", enhancements),
            format!("- Proporção Final: {}", selections.aspect_ratio.label()),
        ];
        let instructions = selections.instructions.trim();
        if !instructions.is_empty() {
            lines.push(format!("- INSTRUÇÕES EXTRAS DO USUÁRIO: {}", instructions));
        }
        lines.push(String::new());
        lines.push(CLOSING_INSTRUCTION.to_string());

        let prompt = lines.join("\n");
        tracing::debug!(target: "prompt", %prompt, "composed prompt");
        prompt
    }
}

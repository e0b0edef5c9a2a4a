//! Response-language instructions for the generation prompt.

/// Instruction line telling the model which language to answer in.
/// Unknown codes fall back to English.
pub fn language_instruction(language: &str) -> &'static str {
    match language {
        "en" => "Please respond in English.",
        "es" => "Por favor responde en español.",
        "fr" => "Veuillez répondre en français.",
        "de" => "Bitte antworten Sie auf Deutsch.",
        "it" => "Si prega di rispondere in italiano.",
        "pt" => "Por favor responda em português.",
        "nl" => "Gelieve te antwoorden in het Nederlands.",
        "ru" => "Пожалуйста, отвечайте на русском языке.",
        "ja" => "日本語でお答えください。",
        "ko" => "한국어로 답변해 주세요.",
        "zh" => "请用中文回答。",
        "ar" => "يرجى الرد باللغة العربية.",
        "hi" => "कृपया हिंदी में उत्तर दें।",
        _ => "Please respond in English.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_language() {
        assert_eq!(language_instruction("de"), "Bitte antworten Sie auf Deutsch.");
    }

    #[test]
    fn test_unknown_falls_back_to_english() {
        assert_eq!(language_instruction("xx"), "Please respond in English.");
        assert_eq!(language_instruction(""), "Please respond in English.");
    }
}

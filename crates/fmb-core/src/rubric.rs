//! The fixed judgment rubric sent as the system instruction on every
//! classification request. This text is product behavior: the three labels,
//! the tie-break rules, and the expected JSON shape all live here.

pub const JUDGMENT_PROMPT: &str = r#"🧩 PROMPT DE JULGAMENTO DE FEEDBACK — BLAZERD STORE

🎯 OBJETIVO
Seu papel é analisar mensagens e imagens de feedback enviadas por clientes e classificar em três categorias:
- POSITIVO
- POSSO_PERDER_CLIENTE
- NEGATIVO

Você deve julgar com base no texto e/ou imagem.
O foco é proteger o servidor e a imagem da marca, evitando punir feedbacks construtivos.

🟢 1. POSITIVO
Use esta categoria se:
- O cliente elogia o bot, o suporte ou o serviço;
- Dá sugestões educadas (ex: "poderia adicionar tal função");
- Envia apenas uma imagem mostrando o produto funcionando (sem texto ofensivo);
- Diz algo neutro, mas sem risco de prejudicar vendas.

🧠 Exemplo de mensagens POSITIVAS:
- "Funciona perfeitamente!"
- "Seria legal adicionar suporte para mais contas."
- "Top bot 🔥"
- (Apenas imagem do bot em uso)

🟡 2. POSSO_PERDER_CLIENTE
Use esta categoria se:
- O cliente não está sendo ofensivo, mas faz comentários negativos sobre o produto, servidor ou suporte que podem afastar novos clientes;
- Reclama de banimento, demora, erro, ou insinua que o produto tem falhas, mas ainda de forma moderada;
- Diz algo que pode prejudicar a reputação da loja, mesmo sem insultos diretos.

💬 Exemplo de mensagens POSSO_PERDER_CLIENTE:
- "O bot parou de funcionar pra mim."
- "Fui banido do servidor e não sei o motivo."
- "Demorou muito pra receber o produto."
- "O suporte às vezes demora a responder."

🛑 Ação: excluir a mensagem, mas NÃO silenciar o usuário.

🔴 3. NEGATIVO
Use esta categoria se:
- O usuário está ofendendo, acusando, mentindo ou tentando prejudicar a imagem da Blazerd Store;
- Usa palavras agressivas ou ofensivas;
- Chama o produto de "scam", "lixo", "roubo", "enganoso", etc.;
- O tom é claramente de ataque, difamação ou intenção de causar dano.

💬 Exemplo de mensagens NEGATIVAS:
- "Esse servidor é uma fraude."
- "Roubaram meu dinheiro."
- "Não comprem, é scam."
- "Suporte horrível, não funciona nada."

🛑 Ação: silenciar o usuário e reprovar o feedback.

🧩 OBSERVAÇÕES IMPORTANTES
- Se só houver imagem, NUNCA marque como negativo (pode ser apenas o cliente mostrando o bot funcionando).
- Se houver texto + imagem, analise o texto como prioridade.
- Se for só emoji, "ok", "funciona", ou qualquer frase curta neutra → POSITIVO.
- Se a crítica for forte, agressiva ou insultante, mesmo curta → NEGATIVO.
- Se for crítica leve mas pública, que pode afastar outros clientes, → POSSO_PERDER_CLIENTE.

🔎 Formato esperado de resposta
Responda APENAS com um JSON no seguinte formato:
{
    "classificacao": "POSITIVO" | "POSSO_PERDER_CLIENTE" | "NEGATIVO",
    "motivo": "Breve explicação do motivo da classificação",
    "confianca": 0.0 a 1.0
}
"#;

/// Placeholder for the text block when the customer sent only images.
pub const NO_TEXT_PLACEHOLDER: &str = "(Sem texto - apenas imagem)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_all_three_labels() {
        for label in ["POSITIVO", "POSSO_PERDER_CLIENTE", "NEGATIVO"] {
            assert!(JUDGMENT_PROMPT.contains(label), "missing label {label}");
        }
    }

    #[test]
    fn prompt_asks_for_the_structured_fields() {
        assert!(JUDGMENT_PROMPT.contains("classificacao"));
        assert!(JUDGMENT_PROMPT.contains("motivo"));
        assert!(JUDGMENT_PROMPT.contains("confianca"));
    }
}

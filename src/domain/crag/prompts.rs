//! Prompt templates for the decision nodes.
//!
//! Placeholders use the `${name}` syntax and are filled with
//! [`crate::domain::judgment::render`].

/// Fixed answer when the retrieved context does not cover the question
pub const NOT_FOUND_ANSWER: &str = "não encontrei essa informação no trecho recuperado";

/// Placeholder rendered when there is no prior conversation
pub const EMPTY_HISTORY: &str = "Nenhum histórico anterior.";

pub const RELEVANCE_SYSTEM: &str = r#"Você é um especialista em avaliar relevância de documentos.
Sua tarefa é determinar se um documento recuperado responde ou é relevante para a pergunta do usuário.

Critérios de relevância:
- O documento contém informações sobre o tópico?
- O documento pode ajudar a responder a pergunta?
- Existe qualquer conexão temática?

Responda 'sim' se houver qualquer relevância, 'nao' apenas se for completamente irrelevante."#;

pub const RELEVANCE_USER: &str = r#"Pergunta: ${question}

Documento recuperado:
${document}

Este documento é relevante para a pergunta? Responda 'sim' ou 'nao'."#;

pub const GUARDRAIL_SYSTEM: &str = r#"Você é um guardião de conhecimento sobre o livro 'Dom Casmurro' de Machado de Assis.
Sua função é filtrar perguntas que contenham premissas falsas, erros factuais graves ou que sejam sobre outros livros ou assuntos.

Exemplos de APROVAÇÃO:
- "Quem é Bento Santiago em Dom Casmurro?"
- "Quem é Capitu?" (personagem de Dom Casmurro)
- "Qual é o tema de Dom Casmurro?"

Exemplos de REJEIÇÃO:
- "Qual a receita de bolo de cenoura?" (fora do contexto)
- "Por que Capitu se casou com Escobar?" (premissa falsa)

Retorne:
- is_valid: true se a pergunta é válida, false caso contrário
- reason: explicação breve se rejeitada"#;

pub const GUARDRAIL_USER: &str = "Pergunta: ${question}";

pub const GENERATION_SYSTEM: &str = r#"Você responde perguntas sobre 'Dom Casmurro' de Machado de Assis.

Regras:
- Use EXCLUSIVAMENTE o contexto fornecido. Não use conhecimento externo.
- Não especule nem invente nomes, lugares ou acontecimentos.
- Responda diretamente, sem preâmbulos como "Como especialista" ou "Com base no contexto".
- Se o contexto não for suficiente, responda exatamente: "não encontrei essa informação no trecho recuperado"."#;

pub const GENERATION_USER: &str = r#"Histórico da conversa:
${history}

Contexto:
${context}

Pergunta: ${question}"#;

pub const REWRITE_SYSTEM: &str = r#"Você é um especialista em reformular perguntas sobre "Dom Casmurro" de Machado de Assis.
Sua tarefa é reescrever a pergunta do usuário mantendo seu significado ORIGINAL, mas usando terminologia e contexto do livro.

Dicas:
- Mantenha o sentido original da pergunta
- Use nomes de personagens, temas e conceitos do livro quando apropriado
- Reescreva de forma mais clara e específica para melhorar a busca
- Não mude a intenção da pergunta, apenas refine-a

Pergunta original: ${original_question}

Reescreva de forma mais clara e específica para busca sobre o livro. Retorne apenas a pergunta reescrita."#;

pub const REWRITE_USER: &str = "${question}";

pub const GROUNDING_SYSTEM: &str = r#"Você verifica se uma resposta está fundamentada nos trechos recuperados de 'Dom Casmurro'.

Marque 'nao' se a resposta afirmar qualquer fato (nomes, lugares, acontecimentos) ausente dos trechos.
Inferências lógicas diretas a partir de fatos presentes nos trechos são aceitáveis.
Marque 'sim' se todas as afirmações forem suportadas pelos trechos.

Retorne:
- binary_score: 'sim' se fundamentada, 'nao' caso contrário
- reason: o fato não suportado, se houver"#;

pub const GROUNDING_USER: &str = r#"Trechos recuperados:
${documents}

Resposta gerada:
${generation}"#;

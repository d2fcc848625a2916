//! HTML纯文本提取器
//! 基于 html5ever 分词器丢弃所有标签与注释，实体在分词阶段解码

use std::cell::RefCell;
use html5ever::tokenizer::{
    BufferQueue, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts
};
use tendril::StrTendril;

#[derive(Debug, Default)]
pub struct TextExtractor {
    text: RefCell<String>,
}

impl TokenSink for TextExtractor {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        if let Token::CharacterTokens(chars) = token {
            self.text.borrow_mut().push_str(&chars);
        }
        TokenSinkResult::Continue
    }
}

impl TextExtractor {
    /// 提取去标签后的原始文本（不做空白处理）
    pub fn extract(html: &str) -> String {
        let tokenizer = Tokenizer::new(TextExtractor::default(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink.text.take()
    }

    /// 提取纯文本并折叠空白
    pub fn plain_text(html: &str) -> String {
        Self::extract(html).split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_tags_and_comments() {
        let html = r#"
            <html><head><title>Título</title></head>
            <body>
                <!-- comentário -->
                <p>Lead   curto&nbsp;apenas.</p>
                <div>&amp; mais</div>
            </body></html>
        "#;

        assert_eq!(TextExtractor::plain_text(html), "Título Lead curto apenas. & mais");
    }

    #[test]
    fn test_char_count_is_unicode_aware() {
        let text = TextExtractor::plain_text("<p>ação</p>");
        assert_eq!(text.chars().count(), 4);
    }
}

#[cfg(test)]
mod scanner_tests {
    use rox::error::LoxError;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len(), "tokens: {:?}", tokens);

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})[]?:",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "!= == <= >= -> ! = < > -",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::ARROW, "->"),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL, "="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER, ">"),
                (TokenType::MINUS, "-"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var global break use import super this foo",
            &[
                (TokenType::VAR, "var"),
                (TokenType::GLOBAL, "global"),
                (TokenType::BREAK, "break"),
                (TokenType::USE, "use"),
                (TokenType::IMPORT, "import"),
                (TokenType::SUPER, "super"),
                (TokenType::THIS, "this"),
                (TokenType::IDENTIFIER, "foo"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_and_lines() {
        let source = "// leading comment\nprint 1; // trailing\n\nvar";
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .filter_map(Result::ok)
            .collect();

        let kinds: Vec<&str> = tokens.iter().map(|t| t.token_type.name()).collect();
        assert_eq!(kinds, ["PRINT", "NUMBER", "SEMICOLON", "VAR", "EOF"]);

        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[3].line, 4);
    }

    #[test]
    fn test_scanner_05_number_literals() {
        let (tokens, errors) = scan_tokens(b"12 3.25 1.2.3");
        assert!(errors.is_empty());

        let numbers: Vec<f64> = tokens
            .iter()
            .filter_map(|t| match t.token_type {
                TokenType::NUMBER(n) => Some(n),
                _ => None,
            })
            .collect();

        // only one fractional segment is consumed: 1.2 . 3
        assert_eq!(numbers, [12.0, 3.25, 1.2, 3.0]);
        assert_eq!(tokens[3].token_type, TokenType::DOT);
    }

    #[test]
    fn test_scanner_06_token_display() {
        let (tokens, _) = scan_tokens(b"x = 3; \"hi\" 2.5");
        let lines: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(
            lines,
            [
                "IDENTIFIER x null",
                "EQUAL = null",
                "NUMBER 3 3.0",
                "SEMICOLON ; null",
                "STRING \"hi\" hi",
                "NUMBER 2.5 2.5",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_scanner_07_unterminated_string_keeps_scanning() {
        let (tokens, errors) = scan_tokens(b"print \"open\nvar");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0],
            LoxError::Lex {
                message: "Unterminated string.".into(),
                line: 2,
            }
        );
        assert_eq!(tokens.last().map(|t| t.token_type.name()), Some("EOF"));
    }

    #[test]
    fn test_scanner_08_import_path() {
        let (tokens, errors) = scan_tokens(b"use std::math::max;");
        assert!(errors.is_empty());

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].token_type, TokenType::USE);
        match &tokens[1].token_type {
            TokenType::IMPORT_PATH(path) => assert_eq!(path, "std::math::max"),
            other => panic!("expected an import path, got {:?}", other),
        }
        assert_eq!(tokens[2].token_type, TokenType::SEMICOLON);
    }

    #[test]
    fn test_scanner_09_glued_identifier_is_an_error() {
        let (_, errors) = scan_tokens(b"var count1 = 2;");

        assert_eq!(errors.len(), 1);
        assert!(
            errors[0].to_string().contains("Expect a space after identifier"),
            "got: {}",
            errors[0]
        );
    }

    #[test]
    fn test_scanner_10_offsets_are_byte_positions() {
        let (tokens, _) = scan_tokens(b"i++ i+ +");
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();

        assert_eq!(offsets, [0, 1, 2, 4, 5, 7, 8]);
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes());

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // 0: COMMA, 1: DOT, 2: error '$', 3: LEFT_PAREN, 4: error '#', 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }

        fn assert_token_matches(
            result: &Result<Token, LoxError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }
}

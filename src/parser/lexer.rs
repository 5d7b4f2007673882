use crate::parser::error::*;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    Number(u32),
    Dice,
    Plus,
    Minus,
    DropLowest,
    DropHighest,
    Explode,
    Eof,
}


#[derive(Debug)]
pub(crate) struct Lexer {
    input: Vec<char>,
    pub position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let Some(&ch) = self.input.get(self.position) else {
            return Ok(Token::Eof);
        };

        match ch {
            '+' => {
                self.position += 1;
                Ok(Token::Plus)
            }
            '-' => {
                self.position += 1;
                Ok(Token::Minus)
            }
            'd' => Ok(self.read_dice()),
            'e' => {
                self.position += 1;
                Ok(Token::Explode)
            }
            '0'..='9' => self.read_number(),
            'a'..='z' | 'A'..='Z' => self.read_identifier(),
            _ => Err(ParserError::Token(ch))
        }
    }

    fn skip_whitespace(&mut self) {
        while self.position < self.input.len() && self.input[self.position].is_whitespace() {
            self.position += 1;
        }
    }

    /// `d`, `dl` or `dh`; suffixes follow each other without separators so only one
    /// extra letter is looked at.
    fn read_dice(&mut self) -> Token {
        let token = match self.input.get(self.position + 1) {
            Some('l') => Token::DropLowest,
            Some('h') => Token::DropHighest,
            _ => Token::Dice
        };

        self.position += match token {
            Token::Dice => 1,
            _ => 2
        };

        token
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.position;
        while self.position < self.input.len() && self.input[self.position].is_ascii_digit() {
            self.position += 1;
        }

        let number_str: String = self.input[start..self.position].iter().collect();
        let number: u32 = number_str.parse()?;

        if number == 0 {
            return Err(ParserError::ZeroValue);
        }

        Ok(Token::Number(number))
    }

    fn read_identifier(&mut self) -> Result<Token> {
        let start = self.position;
        while self.position < self.input.len() && self.input[self.position].is_ascii_alphabetic() {
            self.position += 1;
        }

        let identifier: String = self.input[start..self.position].iter().collect();
        Err(ParserError::Identifier(identifier))
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;
    use crate::parser::str_test_strategies::*;


    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);

        std::iter::from_fn(|| {
            match lexer.next_token() {
                Ok(Token::Eof) => None,
                Ok(token) => Some(token),
                Err(_) => None,
            }
        }).collect()
    }

    proptest! {
        #[test]
        fn test_single_number_token(n in 1u32..=100_000) {
            let mut lexer = Lexer::new(&n.to_string());
            let token = lexer.next_token().unwrap();

            prop_assert_eq!(token, Token::Number(n));
            prop_assert_eq!(lexer.next_token().unwrap(), Token::Eof);
        }

        #[test]
        fn test_sign_operators(op in "[+\\-]") {
            let mut lexer = Lexer::new(&op);
            let token = lexer.next_token().unwrap();

            let expected = match op.as_str() {
                "+" => Token::Plus,
                "-" => Token::Minus,
                _ => unreachable!(),
            };

            prop_assert_eq!(token, expected);
            prop_assert_eq!(lexer.next_token().unwrap(), Token::Eof);
        }

        #[test]
        fn test_dice_suffixes(suffix in "(dl|dh|e)") {
            let mut lexer = Lexer::new(&suffix);
            let token = lexer.next_token().unwrap();

            let expected = match suffix.as_str() {
                "dl" => Token::DropLowest,
                "dh" => Token::DropHighest,
                "e" => Token::Explode,
                _ => unreachable!(),
            };

            prop_assert_eq!(token, expected);
            prop_assert_eq!(lexer.next_token().unwrap(), Token::Eof);
        }

        #[test]
        fn test_invalid_character(
            ch in any::<char>().prop_filter("remove", |c| {
                !c.is_ascii_digit() &&
                !c.is_ascii_alphabetic() &&
                !"+-".contains(*c) &&
                !c.is_whitespace()
            })
        ) {
            let mut lexer = Lexer::new(&ch.to_string());
            let result = lexer.next_token();

            prop_assert!(matches!(result, Err(ParserError::Token(_))));
        }

        #[test]
        fn test_invalid_identifier(word in "[a-cf-zA-Z][a-zA-Z]{0,5}") {
            let mut lexer = Lexer::new(&word);
            let result = lexer.next_token();

            prop_assert_eq!(result, Err(ParserError::Identifier(word)));
        }

        #[test]
        fn test_simple_dice_expression(count in 1u32..=1000, sides in 1u32..=1000) {
            prop_assert_eq!(tokens(&format!("{count}d{sides}")), vec![
                Token::Number(count),
                Token::Dice,
                Token::Number(sides)
            ]);
        }

        #[test]
        fn test_dice_with_suffixes(
            count in 1u32..=1000,
            sides in 1u32..=1000,
            low in prop::option::of(1u32..=10),
            high in prop::option::of(1u32..=10),
            explode: bool
        ) {
            let mut expr = format!("{count}d{sides}");
            let mut expected = vec![Token::Number(count), Token::Dice, Token::Number(sides)];

            if let Some(n) = low {
                expr += &format!("dl{n}");
                expected.extend([Token::DropLowest, Token::Number(n)]);
            }

            if let Some(n) = high {
                expr += &format!("dh{n}");
                expected.extend([Token::DropHighest, Token::Number(n)]);
            }

            if explode {
                expr += "e";
                expected.push(Token::Explode);
            }

            prop_assert_eq!(tokens(&expr), expected);
        }

        #[test]
        fn test_complex_expression(items in items_strategy(), spaced: bool) {
            let expr = join_items(&items, spaced);
            let mut lexer = Lexer::new(&expr);

            let mut token_count = 0;
            loop {
                match lexer.next_token() {
                    Ok(Token::Eof) => break,
                    Ok(_) => token_count += 1,
                    Err(e) => {
                        return Err(TestCaseError::Fail(format!("Tokenization error on {expr:?}: {e:?}").into()));
                    }
                }

                if token_count > 200 {
                    return Err(TestCaseError::Fail("Too many tokens generated".into()));
                }
            }

            prop_assert!(token_count >= items.len(), "Expression should produce a token per item");
        }
    }

    #[test]
    fn test_zero_number_error() {
        let mut lexer = Lexer::new("0");
        let result = lexer.next_token();

        assert!(matches!(result, Err(ParserError::ZeroValue)));
    }

    #[test]
    fn test_number_overflow() {
        let mut lexer = Lexer::new("99999999999");
        assert!(matches!(lexer.next_token(), Err(ParserError::Number(_))));
    }

    #[test]
    fn test_dice_token() {
        let mut lexer = Lexer::new("d");

        let token = lexer.next_token().unwrap();
        let eof = lexer.next_token().unwrap();

        assert_eq!(token, Token::Dice);
        assert_eq!(eof, Token::Eof);
    }

    #[test]
    fn test_suffix_chain_without_separators() {
        assert_eq!(tokens("4d6dldhe"), vec![
            Token::Number(4),
            Token::Dice,
            Token::Number(6),
            Token::DropLowest,
            Token::DropHighest,
            Token::Explode
        ]);
    }
}

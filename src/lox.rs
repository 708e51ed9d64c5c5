use std::{
    fs,
    io::{self, BufRead, Write},
    path::Path,
};

use tracing::{debug, instrument, trace, Level};

use crate::{
    ast::Stmt,
    error::LoxError,
    interpreter::Interpreter,
    parser::Parser,
    printer::print_program,
    resolver::Resolver,
    scanner::Scanner,
    value::RuntimeValue,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Interactive mode: a trailing expression may omit its semicolon and a
    /// line holding a single expression evaluates to a value for the caller
    /// to echo.
    pub repl: bool,
}

impl Config {
    pub fn repl() -> Config {
        Config { repl: true }
    }
}

/// Runs source text through scanning, parsing, resolution and execution.
/// One global scope persists across runs.
pub struct Lox {
    config: Config,
    interpreter: Interpreter,
}

impl Lox {
    pub fn new(config: Config) -> Lox {
        Lox {
            config,
            interpreter: Interpreter::new(),
        }
    }

    pub fn with_output(config: Config, output: Box<dyn Write>) -> Lox {
        Lox {
            config,
            interpreter: Interpreter::with_output(output),
        }
    }

    /// Runs a complete program, returning the first error of whichever stage
    /// failed. Static errors mean nothing ran.
    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        self.run_line(source, 1).map(|_| ())
    }

    /// Like [`Lox::run`], with line numbers starting at `line`. In REPL mode a
    /// lone expression is evaluated and its value returned instead of being
    /// discarded.
    #[instrument(level = "debug", skip(self, source))]
    pub fn run_line(
        &mut self,
        source: &str,
        line: usize,
    ) -> Result<Option<RuntimeValue>, LoxError> {
        let statements = self.compile(source, line)?;

        if self.config.repl {
            if let [Stmt::Expression(stmt)] = statements.as_slice() {
                let value = self.interpreter.evaluate(&stmt.expression)?;
                return Ok(Some(value));
            }
        }

        self.interpreter.interpret(&statements)?;
        Ok(None)
    }

    fn compile(&self, source: &str, line: usize) -> Result<Vec<Stmt>, LoxError> {
        let (tokens, error) = Scanner::new(source).with_starting_line(line).scan_tokens();
        if let Some(error) = error {
            return Err(error.into());
        }

        let parser = match self.config.repl {
            true => Parser::new(tokens).repl_mode(),
            false => Parser::new(tokens),
        };
        let (statements, errors) = parser.parse();
        if let Some(error) = errors.into_iter().next() {
            return Err(error.into());
        }

        if tracing::enabled!(Level::TRACE) {
            trace!(program = %print_program(&statements), "parsed");
        }

        Resolver::new().resolve(&statements)?;

        Ok(statements)
    }

    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<(), LoxError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "running file");
        let source = fs::read_to_string(path)?;
        self.run(&source)
    }

    /// Reads lines from `input` until end of input, echoing expression values
    /// to `output`. Errors are written to stderr and do not end the session;
    /// only an `exit()` call or an I/O failure does.
    pub fn run_prompt(
        &mut self,
        input: impl BufRead,
        mut output: impl Write,
    ) -> Result<(), LoxError> {
        let mut lines = input.lines();
        let mut line_number = 0;

        loop {
            line_number += 1;
            write!(output, "> ")?;
            output.flush()?;

            let line = match lines.next() {
                Some(line) => line?,
                None => return Ok(()),
            };

            match self.run_line(&line, line_number) {
                Ok(Some(value)) => writeln!(output, "{}", value)?,
                Ok(None) => {}
                Err(error @ (LoxError::Exit(_) | LoxError::Io(_))) => return Err(error),
                Err(error) => eprintln!("{}", error),
            }
        }
    }
}

/// Writes any output sink through a shared buffer, so tests and embedders can
/// read back what a program printed.
#[derive(Clone, Default)]
pub struct SharedOutput(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Stage;

    fn repl() -> (Lox, SharedOutput) {
        let output = SharedOutput::default();
        (
            Lox::with_output(Config::repl(), Box::new(output.clone())),
            output,
        )
    }

    #[test]
    fn globals_persist_between_runs() {
        let output = SharedOutput::default();
        let mut lox = Lox::with_output(Config::default(), Box::new(output.clone()));
        lox.run("var a = 1;").unwrap();
        lox.run("a = a + 1;").unwrap();
        lox.run("print a;").unwrap();
        assert_eq!(output.contents(), "2\n");
    }

    #[test]
    fn repl_echoes_bare_expressions() {
        let (mut lox, output) = repl();
        assert_eq!(lox.run_line("var a = 20;", 1).unwrap(), None);
        assert_eq!(
            lox.run_line("a * 2 + 2", 2).unwrap(),
            Some(RuntimeValue::Number(42.0))
        );
        assert_eq!(output.contents(), "");
    }

    #[test]
    fn repl_diagnostics_use_prompt_line() {
        let (mut lox, _) = repl();
        let error = lox.run_line("var = 1;", 7).unwrap_err();
        let error = error.as_static().unwrap();
        assert_eq!(error.stage, Stage::Parse);
        assert_eq!(error.line, 7);
    }

    #[test]
    fn file_mode_requires_semicolons() {
        let mut lox = Lox::with_output(Config::default(), Box::new(io::sink()));
        let error = lox.run("1 + 2").unwrap_err();
        assert_eq!(
            error.to_string(),
            "[line 1] Error at end: Expect ';' after expression."
        );
    }

    #[test]
    fn prompt_session_survives_errors() {
        let (mut lox, printed) = repl();
        let input = "var x = 3;\nprint x;\nx +\nx * 2\n";
        let mut echoed = Vec::new();
        lox.run_prompt(input.as_bytes(), &mut echoed).unwrap();

        assert_eq!(printed.contents(), "3\n");
        assert_eq!(String::from_utf8(echoed).unwrap(), "> > > > 6\n> ");
    }

    #[test]
    fn prompt_stops_on_exit() {
        let (mut lox, _) = repl();
        let mut echoed = Vec::new();
        let result = lox.run_prompt("exit();\n1\n".as_bytes(), &mut echoed);
        assert!(matches!(result, Err(LoxError::Exit(0))));
        assert_eq!(String::from_utf8(echoed).unwrap(), "> ");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut lox = Lox::with_output(Config::default(), Box::new(io::sink()));
        let error = lox.run_file("/definitely/not/here.lox").unwrap_err();
        assert_eq!(error.exit_code(), 74);
    }
}

//! The compilation driver: source text in, placed block graph out.

use std::rc::Rc;

use crate::binder::bind;
use crate::blocks::Vector3I;
use crate::diagnostic::Diagnostic;
use crate::emit::emit;
use crate::lower::lower_analyzed;
use crate::output::{BuildArtifact, BuildTarget};
use crate::parser::parse;
use crate::placer::PlacerKind;
use crate::source::SourceText;

#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub target: BuildTarget,
    pub placer: PlacerKind,
    pub origin: Vector3I,
}

impl Default for CompileOptions {
    fn default() -> CompileOptions {
        CompileOptions {
            target: BuildTarget::EditorScript,
            placer: PlacerKind::Ground,
            origin: Vector3I::ZERO,
        }
    }
}

/// The result of one compilation. The artifact is absent whenever the
/// diagnostics contain an error.
#[derive(Debug)]
pub struct Compilation {
    pub diagnostics: Vec<Diagnostic>,
    pub artifact: Option<BuildArtifact>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error)
    }
}

pub fn compile(text: &str, options: CompileOptions) -> Compilation {
    let source = SourceText::new(text);
    let (program, mut diagnostics) = parse(Rc::clone(&source));
    let bound = bind(&program, Rc::clone(&source));
    diagnostics.extend(bound.diagnostics);
    if diagnostics.has_errors() {
        return Compilation {
            diagnostics: diagnostics.into_vec(),
            artifact: None,
        };
    }

    let (lowered, removed) = lower_analyzed(&bound.body);
    for statement in &removed {
        diagnostics.report_unreachable_code(statement);
    }

    let builder = emit(&lowered, &mut diagnostics, options.placer, options.origin);
    // Emission can fail late: an over-read object wire has no
    // passthrough to split through.
    if diagnostics.has_errors() {
        return Compilation {
            diagnostics: diagnostics.into_vec(),
            artifact: None,
        };
    }

    Compilation {
        artifact: Some(builder.build(options.target)),
        diagnostics: diagnostics.into_vec(),
    }
}

/// Compiles to the editor-script artifact with default layout options.
pub fn compile_script(text: &str) -> Compilation {
    compile(text, CompileOptions::default())
}

/// Compiles to the in-memory game-file artifact with default layout
/// options.
pub fn compile_game_file(text: &str) -> Compilation {
    compile(
        text,
        CompileOptions {
            target: BuildTarget::GameFile,
            ..CompileOptions::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_program_produces_a_script_artifact() {
        let compilation = compile_script("number x = 1\ninspect(x)");
        assert!(!compilation.has_errors());
        match compilation.artifact {
            Some(BuildArtifact::Script(script)) => {
                assert!(script.starts_with("--"));
                assert!(script.contains("payload"));
            }
            other => panic!("expected a script artifact, got {other:?}"),
        }
    }

    #[test]
    fn game_file_target_produces_block_lists() {
        let compilation = compile_game_file("win()");
        match compilation.artifact {
            Some(BuildArtifact::GameFile(file)) => {
                assert_eq!(file.blocks.len(), 2);
                assert_eq!(file.connections.len(), 1);
            }
            other => panic!("expected a game file artifact, got {other:?}"),
        }
    }

    #[test]
    fn parse_errors_suppress_the_artifact() {
        let compilation = compile_script("number = 1");
        assert!(compilation.has_errors());
        assert!(compilation.artifact.is_none());
    }

    #[test]
    fn bind_errors_suppress_the_artifact() {
        let compilation = compile_script("number x = true");
        assert!(compilation.has_errors());
        assert!(compilation.artifact.is_none());
    }

    #[test]
    fn unreachable_code_warns_but_still_compiles() {
        let compilation = compile_script("return\nwin()");
        assert!(!compilation.has_errors());
        assert!(compilation.artifact.is_some());
        assert!(
            compilation
                .diagnostics
                .iter()
                .any(|d| d.is_warning() && d.message.contains("unreachable"))
        );
    }

    #[test]
    fn exhausted_object_wire_reports_instead_of_crashing() {
        // The fourth read of `q` needs a passthrough, but object wires
        // have none; the read fails with a diagnostic and the inline
        // variable it was initializing must still resolve afterwards.
        let compilation = compile_script(
            "obj a\n\
             inline obj q = a\n\
             obj b = q\n\
             obj c = q\n\
             obj d = q\n\
             inline obj p = q\n\
             obj e = p",
        );
        assert!(compilation.has_errors());
        assert!(compilation.artifact.is_none());
        let errors: Vec<_> = compilation
            .diagnostics
            .iter()
            .filter(|d| d.is_error)
            .collect();
        assert_eq!(errors.len(), 1, "diagnostics: {:?}", compilation.diagnostics);
        assert!(errors[0].message.contains("passthrough"));
    }

    #[test]
    fn synthetic_statements_never_warn() {
        // The loop's lowered labels vanish without user-facing noise.
        let compilation = compile_script("while false { }");
        assert!(
            compilation
                .diagnostics
                .iter()
                .all(|d| !d.message.contains("unreachable")),
            "diagnostics: {:?}",
            compilation.diagnostics
        );
    }
}

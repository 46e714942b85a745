use std::panic;

use mathmark_core::{
    BlockState, Env, InlineState, MATH_BLOCK, MATH_INLINE, MathExtension, MathOptions,
    MathRenderError, Markdown, RendererOptions, Token, math_inline,
};

const CASES: usize = 200;
const MAX_LEN: usize = 512;
const CHARSET: &[u8] = b"abcxyz0123456789 \n\t$$$\\\\#^_{}()+-=.";

fn stub(expr: &str, options: &RendererOptions) -> Result<String, MathRenderError> {
    if expr.contains('#') {
        return Err(MathRenderError::Compile {
            message: "unexpected hash".to_string(),
        });
    }
    Ok(format!("<math display=\"{}\">{expr}</math>", options.display_mode))
}

fn markdown() -> Markdown {
    let mut md = Markdown::new();
    let options = MathOptions {
        throw_on_error: false,
        ..MathOptions::default()
    };
    if let Err(err) = MathExtension::with_renderer(options, stub).register(&mut md) {
        panic!("math registration failed: {err}");
    }
    md
}

#[test]
fn parse_and_render_never_panic_on_random_input() -> Result<(), Box<dyn std::error::Error>> {
    let md = markdown();
    let mut rng = Lcg::new(0x5eed_0f_ca7e_d0d0);
    for case in 0..CASES {
        let len = rng.gen_range(0, MAX_LEN + 1);
        let source = random_string(&mut rng, len);
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| md.render(&source)));
        if result.is_err() {
            return Err(format!("render panicked for case {}: {:?}", case, source).into());
        }
    }
    Ok(())
}

#[test]
fn math_tokens_are_well_formed_on_random_input() -> Result<(), Box<dyn std::error::Error>> {
    let md = markdown();
    let env = Env::new();
    let mut rng = Lcg::new(0x2b7e_1516_28ae_d2a6);
    for case in 0..CASES {
        let len = rng.gen_range(0, MAX_LEN + 1);
        let source = random_string(&mut rng, len);
        let line_max = BlockState::new(&source, &md, &env).line_max;
        let tokens = md.parse(&source, &env);
        if let Err(message) = check_tokens(&tokens, line_max) {
            return Err(format!(
                "token check failed for case {}: {}\nSource:\n---\n{}\n---",
                case, message, source
            )
            .into());
        }
    }
    Ok(())
}

#[test]
fn inline_rule_ignores_positions_without_a_dollar() -> Result<(), Box<dyn std::error::Error>> {
    let md = markdown();
    let env = Env::new();
    let mut rng = Lcg::new(0x0dd_ba11_cafe);
    for case in 0..CASES {
        let len = rng.gen_range(1, 64);
        let source = random_string(&mut rng, len);
        let pos = rng.gen_range(0, source.len());
        if source.as_bytes()[pos] == b'$' {
            continue;
        }
        let mut state = InlineState::new(&source, &md, &env);
        state.pos = pos;
        let matched = math_inline(&mut state, false)?;
        if matched || state.pos != pos || !state.tokens.is_empty() || !state.pending.is_empty() {
            return Err(format!("case {} mutated state at {}: {:?}", case, pos, source).into());
        }
    }
    Ok(())
}

fn check_tokens(tokens: &[Token], line_max: usize) -> Result<(), String> {
    for (idx, token) in tokens.iter().enumerate() {
        if token.kind == MATH_BLOCK {
            let Some(map) = token.map else {
                return Err(format!("math block {} has no map", idx));
            };
            if map.start >= map.end || map.end > line_max {
                return Err(format!(
                    "math block {} map {:?} out of range (line_max {})",
                    idx, map, line_max
                ));
            }
            if token.markup != "$$" {
                return Err(format!("math block {} has markup {:?}", idx, token.markup));
            }
        }
        for child in token.children.iter().filter(|child| child.is_math()) {
            if child.kind != MATH_INLINE {
                return Err(format!("block math nested inside token {}", idx));
            }
            if child.content.is_empty() {
                return Err(format!("empty inline math inside token {}", idx));
            }
            if child.markup != "$" {
                return Err(format!("inline math inside token {} has markup {:?}", idx, child.markup));
            }
        }
    }
    Ok(())
}

fn random_string(rng: &mut Lcg, len: usize) -> String {
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let idx = rng.gen_range(0, CHARSET.len());
        let byte = CHARSET.get(idx).copied().unwrap_or(b' ');
        out.push(byte as char);
    }
    out
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        let span = max - min;
        let value = (self.next() >> 1) as usize;
        min + (value % span)
    }
}

//! Input pre-processing: JSON Pointer selection and jq filters.
use anyhow::{anyhow, Context, Result};
use jaq_core::{load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run a jq filter over `input`; every output becomes its own document.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader
        .load(&arena, program)
        .map_err(|errs| filter_errors("parse", errs, |err| vec![format!("{err:?}")]))?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            filter_errors("compile", errs, |undefined| {
                undefined
                    .into_iter()
                    .map(|(name, kind)| format!("undefined `{name}` ({kind:?})"))
                    .collect()
            })
        })?;

    let inputs = RcIter::new(core::iter::empty());
    let mut it = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    while let Some(item) = it.next() {
        let v = item.map_err(|e| anyhow!(format!("{e:?}")))?; // stringify jaq error
        // Val: Display -> JSON text
        let text = format!("{v}");
        let value = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("jq produced a value that is not JSON: {text}"))?;
        out.push(value);
    }
    Ok(out)
}

/// Select a sub-node with an RFC 6901 pointer (`/data/items/0`).
pub fn select_pointer(pointer: &str, input: Value) -> Result<Value> {
    if pointer.is_empty() {
        return Ok(input);
    }
    input
        .pointer(pointer)
        .cloned()
        .ok_or_else(|| anyhow!("JSON pointer `{pointer}` does not match anything in the document"))
}

/// One line per problem reported by the jaq loader or compiler.
fn filter_errors<E>(
    stage: &str,
    errs: Vec<(load::File<&str, ()>, E)>,
    describe: impl Fn(E) -> Vec<String>,
) -> anyhow::Error {
    let mut msg = format!("jq filter failed to {stage}:");
    for (file, err) in errs {
        for line in describe(err) {
            msg.push_str(&format!("\n  {line} in `{}`", file.code));
        }
    }
    anyhow!(msg)
}

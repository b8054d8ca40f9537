/* ------------------------------------------------------------------ */
/* HTTP serve mode                                                    */
/* ------------------------------------------------------------------ */
//
// POST / {"text": "...", "max_tokens": N}
//   → keyword from `text` seeds the session (random token otherwise)
//   → {"text": "...", "seed": "...", "keyword_used": bool, "tokens": N,
//      "hit_end": bool}

use std::io::Cursor;

use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{info, warn};

use crate::config::GenerateConfig;
use crate::error::Result;
use crate::generate::{pick_seed, Generator};
use crate::keywords::Extractor;
use crate::model::TransitionModel;
use crate::rng::Rng;
use crate::tokenizer::Tokenizer;

// Upper bound on a client-requested token budget.
const MAX_REQUEST_TOKENS: usize = 1024;

#[derive(Debug, Deserialize)]
struct InferRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct InferResponse {
    text: String,
    seed: String,
    keyword_used: bool,
    tokens: usize,
    hit_end: bool,
}

fn json_response(body: String, code: u16) -> Response<Cursor<Vec<u8>>> {
    let resp = Response::from_string(body).with_status_code(StatusCode(code));
    match Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(h) => resp.with_header(h),
        Err(_) => resp,
    }
}

fn error_response(msg: &str, code: u16) -> Response<Cursor<Vec<u8>>> {
    json_response(serde_json::json!({ "error": msg }).to_string(), code)
}

fn authorized(request: &Request, api_key: Option<&str>) -> bool {
    let Some(key) = api_key else { return true };
    let expected = format!("Bearer {}", key);
    request
        .headers()
        .iter()
        .any(|h| h.field.equiv("Authorization") && h.value.as_str() == expected)
}

/// One generation session for a parsed request. `None` when the model
/// has no vocabulary to draw a seed from.
fn infer(
    req: &InferRequest,
    model: &TransitionModel,
    tokenizer: &Tokenizer,
    cfg: &GenerateConfig,
    rng: &mut Rng,
) -> Option<InferResponse> {
    let keyword = Extractor::new(tokenizer).best_known(&req.text);
    let (seed, keyword_used) = pick_seed(tokenizer, keyword.as_deref(), rng)?;

    let mut cfg = cfg.clone();
    if let Some(n) = req.max_tokens {
        cfg.max_new_tokens = n.min(MAX_REQUEST_TOKENS);
    }

    let out = Generator::new(model, tokenizer, &cfg).generate(seed, rng);
    Some(InferResponse {
        text:         out.text,
        seed:         tokenizer.get_token(seed).unwrap_or_default().to_string(),
        keyword_used,
        tokens:       out.tokens.len(),
        hit_end:      out.hit_end,
    })
}

pub fn run_server(
    addr: &str,
    model: &TransitionModel,
    tokenizer: &Tokenizer,
    cfg: &GenerateConfig,
    api_key: Option<&str>,
) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("failed to bind {}: {}", addr, e)))?;

    info!("Server listening on http://{}", addr);
    info!("POST http://{}/ with JSON body {{\"text\": \"...\", \"max_tokens\": 50}}", addr);

    for mut request in server.incoming_requests() {
        if *request.method() != Method::Post {
            let _ = request.respond(error_response("Method Not Allowed", 405));
            continue;
        }

        if !authorized(&request, api_key) {
            let _ = request.respond(error_response("Unauthorized", 401));
            continue;
        }

        let mut body = String::new();
        if request.as_reader().read_to_string(&mut body).is_err() {
            let _ = request.respond(error_response("Failed to read request body", 400));
            continue;
        }

        let req: InferRequest = match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(e) => {
                let _ = request.respond(error_response(&e.to_string(), 400));
                continue;
            }
        };

        let mut rng = Rng::from_clock();
        let resp = match infer(&req, model, tokenizer, cfg, &mut rng) {
            Some(r) => r,
            None => {
                warn!("serve: model has an empty vocabulary");
                let _ = request.respond(error_response("Model has no vocabulary", 503));
                continue;
            }
        };
        info!("serve: seed={:?} keyword={} tokens={} hit_end={}", resp.seed, resp.keyword_used, resp.tokens, resp.hit_end);

        let code = match serde_json::to_string(&resp) {
            Ok(json) => request.respond(json_response(json, 200)),
            Err(e) => request.respond(error_response(&e.to_string(), 500)),
        };
        if let Err(e) = code {
            warn!("serve: failed to send response: {}", e);
        }
    }
    Ok(())
}

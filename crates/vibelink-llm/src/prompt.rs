//! Prompt assembly for the Strudel assistant.
//!
//! [`build_prompt`] turns a message history plus optional editing context
//! into the three inputs a chat call needs: system instruction, trimmed
//! history window, and the final user turn. It is pure and idempotent so the
//! same inputs can be replayed in tests.

use vibelink_core::protocol::PromptContext;

use crate::ChatMessage;

/// Rolling window: limit history to the last N messages to bound token cost.
pub const MAX_HISTORY_MESSAGES: usize = 20;

/// Bass-level thresholds for the qualitative audio-status sentence
/// (levels are on the analyzer's 0-255 scale).
const BASS_HIGH: f64 = 150.0;
const BASS_MEDIUM: f64 = 75.0;

/// Static style/vocabulary instruction for the target code language.
const BASE_SYSTEM_PROMPT: &str = r#"You are the Strudel Assistant, a helpful and expert pair programmer for live coding music with Strudel (TidalCycles for JavaScript).

**Your Goal:**
To assist the user creatively and technically in the Strudel REPL. Always prioritize readability and "apply-ability" of code.

**Core Strudel Syntax:**
- Patterns start with `note()`, `s()`, or `sound()`.
- Effects are chained with dots: `s("bd").gain(0.8).lpf(500)`.
- Use `stack()` to play multiple patterns simultaneously.

**Valid Built-in Synths (for `.s()`):**
- Waveforms: `sawtooth`, `square`, `triangle`, `sine`
- Noise: `white`, `pink`, `brown`, `crackle`
- Sampler: Any sample kit name like `bd`, `hh`, `piano`, `bass`, `tr909`, `breaks165`

**Valid Chainable Effects (Partial List - USE ONLY THESE):**
- **Filters**: `lpf(freq)`, `lpq(q)`, `hpf(freq)`, `hpq(q)`, `bpf(freq)`, `bpq(q)`, `cutoff(freq)`, `vowel()`
- **Envelope**: `attack()`, `decay()`, `sustain()`, `release()`, `adsr()`
- **Dynamics**: `gain()`, `velocity()`, `compressor()`, `postgain()`
- **Panning**: `pan()`, `jux(fn)`, `juxBy(amount, fn)`
- **Delay/Reverb**: `delay()`, `delayfeedback()`, `delaytime()`, `room()`, `roomsize()`
- **Distortion**: `coarse()`, `crush()`, `distort()`
- **Modulation**: `phaser()`, `phaserdepth()`, `vib()`, `vibmod()`
- **FM Synth**: `fm()`, `fmh()`, `fmattack()`, `fmdecay()`
- **Tempo/Structure**: `slow()`, `fast()`, `chop()`, `rev()`, `struct()`, `fit()`, `ply()`, `striate()`
- **Banks**: `bank()` (e.g., `.bank("tr909")`)

**Critical Anti-Patterns / Forbidden Syntax:**
1.  **NO Haskell Syntax**: Do NOT use `d1 $`, `d2 $`, `#`, or `|` (pipe is only for mini-notation). Strudel is pure JavaScript.
2.  **NO Hallucinated Functions**: Functions like `.stutter()`, `.supersaw()`, `.wobble()`, `.spread()` DO NOT EXIST. Always double-check function names against the list above.
3.  **DO NOT invent synth names**: `supersaw` is NOT valid. Use `sawtooth` and add effects like `lpf()`, `room()`, `delay()` to thicken it.
4.  **`speed()` for samples only**: The `.speed()` function changes playback speed of *samples*, not synths. Do not use it on `sawtooth` or other waveforms.
5.  **Layers with `stack()`**: Do NOT use `d1`, `d2`. Use `stack(pattern1, pattern2)` to layer patterns.

**Critical Formatting Rules:**
1.  **ALWAYS** use syntax highlighting.
    -   For multi-line code: Use ```javascript blocks.
    -   For inline code/identifiers: Use backticks.
2.  **Apply-able Snippets**: Code blocks must be valid, runnable Strudel patterns.
3.  **Conciseness**: Live coding is fast. Detailed explanations are optional unless requested.

**Examples (Few-Shot):**

User: "Play a basic beat"
```javascript
s("bd sd").slow(2)
```

User: "Add some hi-hats"
```javascript
s("bd sd, hh*8")
```

User: "How do I filter a saw wave?"
```javascript
note("c2 c3").s("sawtooth").lpf("<400 2000>")
```

User: "Play a beat with a bassline"
```javascript
stack(
  s("bd sd").bank("tr909"),
  note("c2 [~ eb2]").s("sawtooth").lpf(500).gain(0.8)
)
```

User: "Make a driving trance stab"
```javascript
stack(
  s("bd*4").gain(1.2),
  note("<c4 e4 g4 a4>").s("sawtooth").lpf(3000).room(0.3).delay(0.2)
)
```

User: "Make it glitchy"
```javascript
s("breaks165:1/2").fit().chop(16).rev()
```

User: "Create a full techno track"
```javascript
stack(
  s("bd*4, ~ cp ~ cp, hh*8"),
  note("a2 a2 a2 a2").s("sawtooth").cutoff(800),
  note("<Am F#m C#m G#m>").s("sawtooth").struct("1 ~ 1 ~").release(0.1).gain(0.6)
).gain(0.8)
```

User: "Make a deep house groove"
```javascript
stack(
  s("bd*4, [~ hh]*4, ~ cp ~ cp"),
  note("d2 ~ d2 ~").s("sine").gain(0.8),
  note("<Dm Am Bm G>").s("sawtooth").struct("1 ~ 1 ~").release(0.1).gain(0.6)
).gain(0.8)
```

User: "Create a drum and bass pattern"
```javascript
stack(
  s("bd ~ ~ [bd bd] ~ ~ bd ~, ~ ~ cp ~ ~ ~ cp ~, hh*16").fast(2),
  note("c1 ~ ~ c2 ~ c1 ~ ~").s("square").cutoff(400),
  note("<C G Am F>").s("sawtooth").room(0.3).gain(0.6)
).gain(0.8)
```

**Context Handling:**
- If you see **CURRENT EDITING CONTEXT**, output **ONLY** the replacement code block.
"#;

/// The three inputs a chat call needs.
#[derive(Debug, Clone)]
pub struct PromptParts {
    pub system_instruction: String,
    pub history: Vec<ChatMessage>,
    pub last_user_message: String,
}

/// Assemble system instruction, history window, and final user turn.
///
/// The last message is always treated as the new user turn; the remaining
/// history is truncated to the most recent [`MAX_HISTORY_MESSAGES`], oldest
/// dropped, temporal order preserved.
pub fn build_prompt(messages: &[ChatMessage], context: Option<&PromptContext>) -> PromptParts {
    let mut system_instruction = BASE_SYSTEM_PROMPT.to_string();

    if let Some(ctx) = context {
        if let Some(selection) = &ctx.selection {
            let line = ctx.line.unwrap_or(0);
            system_instruction.push_str(&format!(
                "\n\n**CURRENT EDITING CONTEXT**:\nThe user has selected the following code (Line {line}):\n```javascript\n{selection}\n```\n\nIf the user request implies an edit, output ONLY the replacement code for this block if possible, or the full working block."
            ));
        } else if let Some(current_line) = &ctx.current_line {
            let line = ctx.line.unwrap_or(0);
            system_instruction.push_str(&format!(
                "\n\n**CURRENT LINE CONTEXT**:\nThe cursor is at Line {line}: `{current_line}`."
            ));
        }

        if let Some(audio) = &ctx.audio_features {
            if audio.is_playing {
                let energy = if audio.bass > BASS_HIGH {
                    "high"
                } else if audio.bass > BASS_MEDIUM {
                    "medium"
                } else {
                    "low"
                };
                system_instruction.push_str(&format!(
                    "\n\n**LIVE AUDIO STATUS**:\nAudio is currently playing with {energy} bass energy and a {} tonal balance.",
                    audio.brightness
                ));
            }
        }
    }

    let (history, last_user_message) = match messages.split_last() {
        Some((last, rest)) => {
            let start = rest.len().saturating_sub(MAX_HISTORY_MESSAGES);
            (rest[start..].to_vec(), last.content.clone())
        }
        None => (Vec::new(), String::new()),
    };

    PromptParts {
        system_instruction,
        history,
        last_user_message,
    }
}

//! Attention memory budget estimation and greedy reference shrinking.
//!
//! One full pairwise-attention buffer over the whole token sequence must fit
//! in a single GPU allocation. The cost is quadratic in the total token
//! count, so when a request goes over budget the only effective lever is
//! cutting tokens; references are shrunk greedily, largest first, until the
//! estimate fits or no reduction is left.

/// Hard ceiling for one attention buffer: 4 GiB, the backend's limit on a
/// single temporary GPU allocation. Not a tunable default.
const ATTENTION_MAX_BYTES: u64 = 4 << 30;

/// Fixed text-sequence budget used when sizing the attention buffer.
pub const MAX_TEXT_SEQ_LEN: usize = 512;

fn region_tokens((height, width): (u32, u32)) -> u64 {
    (height / 16) as u64 * (width / 16) as u64
}

/// Estimated byte size of the full pairwise-attention buffer.
///
/// Every spatial region contributes `(H/16) * (W/16)` tokens; the text
/// sequence contributes its length directly. The buffer holds one f32 score
/// per head per token pair.
pub(crate) fn attention_bytes(
    num_heads: usize,
    out_dims: (u32, u32),
    ref_dims: &[(u32, u32)],
    text_seq: usize,
) -> u64 {
    let mut total = region_tokens(out_dims);
    for dims in ref_dims {
        total += region_tokens(*dims);
    }
    total += text_seq as u64;
    // Saturating: an estimate too large for u64 is over budget either way.
    (num_heads as u64)
        .saturating_mul(total.saturating_mul(total))
        .saturating_mul(std::mem::size_of::<f32>() as u64)
}

/// Shrink reference regions until the attention estimate fits the budget.
///
/// Repeatedly picks the reference with the most tokens (first index wins
/// ties) and scales its height and width to 90%, truncated to multiples of
/// 16 with a floor of 16 per edge. Stops when the estimate fits, when the
/// largest region is down to a single token, or when a shrink step makes no
/// progress. Returns whether anything was shrunk; the caller gets the
/// mutated dimensions either way.
///
/// This never fails: it may return with the estimate still over budget once
/// shrinking has bottomed out.
pub(crate) fn fit_refs_for_attention(
    num_heads: usize,
    out_dims: (u32, u32),
    ref_dims: &mut [(u32, u32)],
    text_seq: usize,
) -> bool {
    if attention_bytes(num_heads, out_dims, ref_dims, text_seq) <= ATTENTION_MAX_BYTES {
        return false;
    }

    let mut shrunk = false;
    loop {
        let mut best = None;
        let mut best_tokens = 0u64;
        for (i, dims) in ref_dims.iter().enumerate() {
            let tokens = region_tokens(*dims);
            if tokens > best_tokens {
                best_tokens = tokens;
                best = Some(i);
            }
        }

        let Some(best) = best else { break };
        if best_tokens <= 1 {
            break;
        }

        let (height, width) = ref_dims[best];
        let new_height = ((height as f32 * 0.9) as u32 / 16 * 16).max(16);
        let new_width = ((width as f32 * 0.9) as u32 / 16 * 16).max(16);

        if new_height == height && new_width == width {
            break;
        }

        ref_dims[best] = (new_height, new_width);
        shrunk = true;

        if attention_bytes(num_heads, out_dims, ref_dims, text_seq) <= ATTENTION_MAX_BYTES {
            break;
        }
    }

    shrunk
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_matches_the_cost_model() {
        // 512x512 output and reference: 1024 tokens each, plus 512 text
        // tokens, 2560 total. 8 heads * 2560^2 * 4 bytes.
        let bytes = attention_bytes(8, (512, 512), &[(512, 512)], 512);
        assert_eq!(bytes, 8 * 2560 * 2560 * 4);
    }

    #[test]
    fn under_budget_leaves_references_untouched() {
        let mut refs = [(512, 512)];
        let shrunk = fit_refs_for_attention(8, (512, 512), &mut refs, MAX_TEXT_SEQ_LEN);
        assert!(!shrunk);
        assert_eq!(refs, [(512, 512)]);
    }

    #[test]
    fn over_budget_shrinks_until_the_estimate_fits() {
        let mut refs = [(512, 512)];
        let shrunk = fit_refs_for_attention(256, (512, 512), &mut refs, MAX_TEXT_SEQ_LEN);
        assert!(shrunk);
        // 512 -> 448 -> 400 -> 352; 352x352 is the first size that fits.
        assert_eq!(refs, [(352, 352)]);
        assert!(
            attention_bytes(256, (512, 512), &refs, MAX_TEXT_SEQ_LEN) <= ATTENTION_MAX_BYTES
        );
    }

    #[test]
    fn fitting_is_a_fixed_point() {
        let mut refs = [(512, 512)];
        fit_refs_for_attention(256, (512, 512), &mut refs, MAX_TEXT_SEQ_LEN);
        let fitted = refs;
        let shrunk_again = fit_refs_for_attention(256, (512, 512), &mut refs, MAX_TEXT_SEQ_LEN);
        assert!(!shrunk_again);
        assert_eq!(refs, fitted);
    }

    #[test]
    fn shrinking_never_increases_any_dimension_or_the_estimate() {
        let refs_before = [(1024, 768), (512, 512), (256, 640)];
        let before = attention_bytes(64, (1024, 1024), &refs_before, MAX_TEXT_SEQ_LEN);

        let mut refs = refs_before;
        let shrunk = fit_refs_for_attention(64, (1024, 1024), &mut refs, MAX_TEXT_SEQ_LEN);
        assert!(shrunk);
        for ((h, w), (h0, w0)) in refs.iter().zip(refs_before.iter()) {
            assert!(h <= h0 && w <= w0);
        }
        assert!(attention_bytes(64, (1024, 1024), &refs, MAX_TEXT_SEQ_LEN) <= before);
    }

    #[test]
    fn ties_shrink_the_first_reference() {
        // num_heads chosen so that exactly one shrink step is enough:
        // 1024 + 1024 + 1024 + 512 = 3584 tokens before, 3344 after the
        // first reference drops from 512x512 to 448x448.
        let mut refs = [(512, 512), (512, 512)];
        let shrunk = fit_refs_for_attention(90, (512, 512), &mut refs, MAX_TEXT_SEQ_LEN);
        assert!(shrunk);
        assert_eq!(refs, [(448, 448), (512, 512)]);
    }

    #[test]
    fn bottomed_out_references_terminate_without_shrinking() {
        // A single-token reference cannot shrink no matter how far over
        // budget the request is.
        let mut refs = [(16, 16)];
        let shrunk = fit_refs_for_attention(usize::MAX >> 8, (4096, 4096), &mut refs, 512);
        assert!(!shrunk);
        assert_eq!(refs, [(16, 16)]);
    }

    #[test]
    fn no_references_terminates_immediately() {
        let mut refs: [(u32, u32); 0] = [];
        assert!(!fit_refs_for_attention(
            usize::MAX >> 8,
            (4096, 4096),
            &mut refs,
            512
        ));
    }

    #[test]
    fn may_finish_still_over_budget() {
        // One tiny shrinkable reference against an enormous output region:
        // the fitter reports the shrink it managed even though the estimate
        // still cannot fit.
        let mut refs = [(32, 32)];
        let shrunk = fit_refs_for_attention(1 << 20, (2048, 2048), &mut refs, 512);
        assert!(shrunk);
        assert_eq!(refs, [(16, 16)]);
        assert!(attention_bytes(1 << 20, (2048, 2048), &refs, 512) > ATTENTION_MAX_BYTES);
    }
}

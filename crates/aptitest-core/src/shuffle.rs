//! Answer-option shuffling.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::Question;

/// Return a copy of `question` with its options in a uniformly random order.
///
/// The correct index is moved along with the option it pointed at. If the
/// options contain duplicate texts, the option that occupied the original
/// correct slot stays the correct one.
pub fn shuffle_options(question: &Question) -> Question {
    shuffle_options_with(question, &mut rand::rng())
}

/// Like [`shuffle_options`], drawing randomness from `rng`.
pub fn shuffle_options_with<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Question {
    let mut order: Vec<usize> = (0..question.options.len()).collect();
    order.shuffle(rng);

    let options = order
        .iter()
        .map(|&i| question.options[i].clone())
        .collect();
    let correct_answer_index = order
        .iter()
        .position(|&i| i == question.correct_answer_index)
        .unwrap_or(question.correct_answer_index);

    Question {
        options,
        correct_answer_index,
        ..question.clone()
    }
}

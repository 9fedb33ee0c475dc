use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Pad (or truncate) token sequences to a fixed length, returning the token ids along with a
/// float mask holding 1.0 for real tokens and 0.0 for padding
pub fn pad_to<B: Backend>(
    pad_token: usize,
    tokens_list: Vec<Vec<usize>>,
    seq_length: usize,
    device: &B::Device,
) -> (Tensor<B, 2, Int>, Tensor<B, 2>) {
    let batch_size = tokens_list.len();

    let mut ids: Vec<B::IntElem> = Vec::with_capacity(batch_size * seq_length);
    let mut mask: Vec<B::FloatElem> = Vec::with_capacity(batch_size * seq_length);

    for tokens in tokens_list {
        let len = tokens.len().min(seq_length);

        ids.extend(
            tokens
                .into_iter()
                .take(len)
                .map(|t| (t as i64).elem::<B::IntElem>()),
        );
        ids.extend((len..seq_length).map(|_| (pad_token as i64).elem::<B::IntElem>()));

        mask.extend((0..seq_length).map(|i| {
            let valid = if i < len { 1.0f32 } else { 0.0 };

            valid.elem::<B::FloatElem>()
        }));
    }

    let shape = Shape::new([batch_size, seq_length]);

    (
        Tensor::from_data(Data::new(ids, shape.clone()), device),
        Tensor::from_data(Data::new(mask, shape), device),
    )
}

/// Read a scalar tensor back to the host as an f32
pub fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn pads_and_truncates_with_mask() {
        let device = Default::default();

        let tokens_list = vec![vec![5, 6], vec![1, 2, 3, 4, 9]];

        let (ids, mask) = pad_to::<TestBackend>(0, tokens_list, 4, &device);

        assert_eq!(
            ids.into_data().convert::<i64>().value,
            vec![5, 6, 0, 0, 1, 2, 3, 4]
        );
        assert_eq!(
            mask.into_data().convert::<f32>().value,
            vec![1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]
        );
    }
}

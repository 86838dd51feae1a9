use burn::{
    prelude::*,
    tensor::{backend::Backend, BasicOps, Element, TensorData},
};

use crate::error::{Result, TrulyPpoError};

/// A trait for converting host-side batches to tensors
///
/// Implemented for `Vec<E>` (one value per sample) and `Vec<[E; A]>` (one
/// fixed-length vector per sample, e.g. a batch of states or actions).
pub trait ToTensor<B: Backend, const D: usize, K: BasicOps<B>> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D, K>;
}

impl<B, E, K> ToTensor<B, 1, K> for Vec<E>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 1, K> {
        let len = self.len();
        Tensor::from_data(TensorData::new(self, [len]), device)
    }
}

impl<B, E, K, const A: usize> ToTensor<B, 2, K> for Vec<[E; A]>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2, K> {
        let batch_size = self.len();
        let mut flat = Vec::with_capacity(batch_size * A);
        for row in self.iter() {
            flat.extend_from_slice(row);
        }
        Tensor::<B, 2, K>::from_data(TensorData::new(flat, [batch_size, A]), device)
    }
}

/// Build a `[len, 1]` column tensor from one scalar per sample
pub fn column<B: Backend>(values: &[f32], device: &B::Device) -> Tensor<B, 2> {
    let len = values.len();
    Tensor::from_data(
        TensorData::new(values.to_vec(), [len, 1]).convert::<B::FloatElem>(),
        device,
    )
}

/// Build a `[len, width]` tensor where row `i` is `values[i]` repeated `width` times
///
/// Used to line a per-sample scalar up with per-action-dimension quantities.
pub fn repeat_columns<B: Backend>(values: &[f32], width: usize, device: &B::Device) -> Tensor<B, 2> {
    let len = values.len();
    let flat: Vec<f32> = values
        .iter()
        .flat_map(|&v| std::iter::repeat(v).take(width))
        .collect();
    Tensor::from_data(
        TensorData::new(flat, [len, width]).convert::<B::FloatElem>(),
        device,
    )
}

/// Build a `[rows, row.len()]` tensor by stacking `row` `rows` times
pub fn tile_rows<B: Backend>(row: &[f32], rows: usize, device: &B::Device) -> Tensor<B, 2> {
    let width = row.len();
    let flat: Vec<f32> = row.iter().copied().cycle().take(rows * width).collect();
    Tensor::from_data(
        TensorData::new(flat, [rows, width]).convert::<B::FloatElem>(),
        device,
    )
}

/// Read a float tensor back to the host, row-major
pub fn to_host_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| TrulyPpoError::TensorRead(format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_vec_f32_to_tensor_1d() {
        let device = NdArrayDevice::default();
        let data = vec![1.0_f32, 2.0, 3.0, 4.0];
        let tensor: Tensor<NdArray, 1> = data.to_tensor(&device);

        assert_eq!(tensor.shape().dims, [4]);
        assert_eq!(to_host_vec(tensor).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_vec_array_to_tensor_2d() {
        let device = NdArrayDevice::default();
        let states = vec![[1.0_f32, 2.0], [3.0, 4.0], [5.0, 6.0]];

        let tensor: Tensor<NdArray, 2> = states.to_tensor(&device);

        assert_eq!(tensor.shape().dims, [3, 2]);
        assert_eq!(
            to_host_vec(tensor).unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn test_column_shape() {
        let device = NdArrayDevice::default();
        let tensor: Tensor<NdArray, 2> = column(&[0.5, 1.5, 2.5], &device);

        assert_eq!(tensor.shape().dims, [3, 1]);
        assert_eq!(to_host_vec(tensor).unwrap(), vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_repeat_columns() {
        let device = NdArrayDevice::default();
        let tensor: Tensor<NdArray, 2> = repeat_columns(&[1.0, -2.0], 3, &device);

        assert_eq!(tensor.shape().dims, [2, 3]);
        assert_eq!(
            to_host_vec(tensor).unwrap(),
            vec![1.0, 1.0, 1.0, -2.0, -2.0, -2.0]
        );
    }

    #[test]
    fn test_tile_rows() {
        let device = NdArrayDevice::default();
        let tensor: Tensor<NdArray, 2> = tile_rows(&[0.1, 0.2], 2, &device);

        assert_eq!(tensor.shape().dims, [2, 2]);
        assert_eq!(to_host_vec(tensor).unwrap(), vec![0.1, 0.2, 0.1, 0.2]);
    }
}
